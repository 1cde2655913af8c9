//! Built-in synthetic corpus used to bootstrap the global model.

use crate::models::{CommentRecord, Label};

pub const SEED_SPAM: [&str; 25] = [
    // obvious
    "BUY VIAGRA NOW! CHEAP PRICES! Click here: http://spam.ru",
    "Make money fast! Work from home! Visit casino.tk for details!!!",
    "Congratulations! You won $1,000,000! Click here to claim prize",
    "Free Bitcoin! Cryptocurrency investment! lottery.ml Join now!!!",
    "CHEAP LOANS! BAD CREDIT OK! Apply now at loans-fast.cn",
    "Weight loss miracle! Lose 50 pounds in 1 week! pharmacy.ga",
    "Hot singles in your area! Click here dating.tk NOW!!!",
    "Prince needs help transferring inheritance. Email me for millions!",
    "CLICK HERE NOW! Limited time offer! BUY NOW ACT FAST!!!",
    "Earn $5000 per week working from home! No experience needed!",
    // moderate
    "Check out my website for amazing deals http://mysite.com",
    "Great post! Visit my blog at http://blog1.com and http://blog2.com",
    "Nice article. Buy my ebook here: http://ebook.com",
    "Interesting. See more at http://link1.com http://link2.com http://link3.com",
    "Thanks for sharing! <a href='spam.com'>Click here</a>",
    // subtle
    "Great post!!!!!!!!",
    "AWESOME ARTICLE!!!!! LOVE IT!!!!!",
    "niceeeee poooost greaaaat joooob",
    "first comment lol subscribe to my channel",
    "F1RST C0MM3NT!!!1!",
    // link drops
    "Best replica watches at http://watches.cn, free shipping worldwide!",
    "Need followers? Buy 10000 followers cheap at http://followers.xyz",
    "Casino bonus 500%!!! Register today http://bonus.top",
    "Your account has been suspended, verify now at http://secure-login.ga",
    "Cheap essay writing service, guaranteed grades http://essays.ml",
];

pub const SEED_HAM: [&str; 25] = [
    // long
    "This is a really insightful article. I particularly appreciated your analysis of the economic impacts. The data you presented clearly supports your conclusions. Thank you for sharing this valuable perspective.",
    "Great explanation! I've been struggling to understand this concept for weeks, and your clear breakdown finally made it click for me. The examples you used were perfect.",
    "I have a different perspective on this issue. While I agree with most of your points, I think we also need to consider the environmental impact. What are your thoughts on that aspect?",
    "Thank you for writing this. As someone who works in this field, I can confirm that your observations are spot-on. This is exactly what we're seeing in practice.",
    "Excellent tutorial! I followed your steps and it worked perfectly. One suggestion: it might be helpful to add a troubleshooting section for common errors.",
    // short
    "Thanks for sharing this!",
    "Very helpful, appreciate it.",
    "Interesting perspective.",
    "Great work!",
    "This helped me a lot, thank you.",
    "Well explained.",
    "I learned something new today.",
    "Bookmarking this for later.",
    "Could you elaborate on the second point?",
    "What source did you use for this data?",
    // questions
    "How does this compare to the previous version?",
    "What would you recommend for beginners?",
    "Has anyone tried implementing this in production?",
    "Are there any prerequisites for this approach?",
    "What are the potential drawbacks of this method?",
    // follow-ups
    "I tried the second approach and the build time dropped by half. Thanks for the detailed walkthrough.",
    "Small typo in the third paragraph, otherwise a very clear write-up.",
    "The diagram really helped me understand how the pieces fit together.",
    "We ran into the same issue last year and ended up solving it in a similar way.",
    "Looking forward to the next part of this series.",
];

const SEED_USER_AGENT: &str = "Training Script";
const SEED_IP: &str = "127.0.0.1";

/// The corpus as labelled comments. Every other author has an email, spam
/// authors on a disposable domain.
pub fn seed_comments() -> Vec<(CommentRecord, Label)> {
    let spam = SEED_SPAM.iter().enumerate().map(|(i, content)| {
        let mut comment = CommentRecord::new(*content, format!("Spammer{}", i), SEED_IP, 1)
            .with_user_agent(SEED_USER_AGENT);
        if i % 2 == 0 {
            comment = comment.with_email(format!("spam{}@tempmail.com", i));
        }
        (comment, Label::Spam)
    });

    let ham = SEED_HAM.iter().enumerate().map(|(i, content)| {
        let mut comment = CommentRecord::new(*content, format!("User{}", i), SEED_IP, 1)
            .with_user_agent(SEED_USER_AGENT);
        if i % 2 == 0 {
            comment = comment.with_email(format!("user{}@gmail.com", i));
        }
        (comment, Label::Ham)
    });

    spam.chain(ham).collect()
}
