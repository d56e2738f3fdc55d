//! Sign-off processing for individual commit messages.

use tracing::debug;

use crate::errors::SignoffError;
use crate::identity::Identity;
use crate::trailer::{self, Trailer, APPROVED_AT, SIGNED_OFF_BY, SIGN_OFF_EXECUTED_BY};

/// Applies the sign-off rules to a single commit message.
///
/// Processing is idempotent: a message that already carries any
/// `Signed-off-by` trailer passes through byte-identically, no matter who
/// signed it.
pub struct SignoffProcessor {
    committer: Identity,
    behalf: Option<String>,
}

impl SignoffProcessor {
    pub fn new(committer: Identity, behalf: Option<String>) -> Self {
        Self { committer, behalf }
    }

    /// Ensure `message` carries a sign-off for `author`.
    ///
    /// Without a behalf URL the committer must be the commit's author.
    /// With one, the author-equality check is waived and the trailer block
    /// additionally records who executed the sign-off and the approval URL.
    pub fn process(&self, message: &str, author: &Identity) -> Result<String, SignoffError> {
        if trailer::contains_signoff(message) {
            debug!("message already signed, passing through unchanged");
            return Ok(message.to_string());
        }

        let new_trailers = match &self.behalf {
            Some(url) => vec![
                Trailer::new(SIGNED_OFF_BY, &author.to_string()),
                Trailer::new(SIGN_OFF_EXECUTED_BY, &self.committer.to_string()),
                Trailer::new(APPROVED_AT, url),
            ],
            None => {
                if !self.committer.same_author(author) {
                    return Err(SignoffError::AuthorMismatch {
                        committer: self.committer.email.clone(),
                        author: author.email.clone(),
                    });
                }
                vec![Trailer::new(SIGNED_OFF_BY, &self.committer.to_string())]
            }
        };
        Ok(trailer::append_trailers(message, &new_trailers))
    }
}
