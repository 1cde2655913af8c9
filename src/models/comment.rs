use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user-submitted comment as received from the request layer
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CommentRecord {
    /// Comment body
    #[validate(length(min = 1, max = 10000))]
    pub content: String,

    /// Display name of the author
    #[validate(length(min = 1, max = 255))]
    pub author: String,

    /// Author email, if given
    #[validate(email)]
    #[serde(default)]
    pub author_email: Option<String>,

    /// Author website, if given
    #[validate(length(max = 500))]
    #[serde(default)]
    pub author_url: Option<String>,

    /// Client IP address
    #[validate(length(min = 1))]
    pub author_ip: String,

    /// Identifier of the post being commented on
    pub post_id: i64,

    /// HTTP User-Agent header
    #[serde(default)]
    pub user_agent: Option<String>,

    /// HTTP Referer header
    #[serde(default)]
    pub referer: Option<String>,
}

impl CommentRecord {
    /// Create a comment with the required attributes only
    pub fn new(
        content: impl Into<String>,
        author: impl Into<String>,
        author_ip: impl Into<String>,
        post_id: i64,
    ) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
            author_email: None,
            author_url: None,
            author_ip: author_ip.into(),
            post_id,
            user_agent: None,
            referer: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.author_email = Some(email.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.author_url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}
