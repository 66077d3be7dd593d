//! Status codes and their reason phrases.

/// An HTTP status code. Any `u16` is representable; only a handful carry a
/// known reason phrase (see [`StatusCode::reason_phrase`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// The known reason phrase for this code, or `None` for anything not
    /// in the small table the original handler cared about. Unknown codes
    /// get an empty reason phrase on the wire, not an absent one.
    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self.0 {
            200 => Some("OK"),
            400 => Some("Bad Request"),
            500 => Some("Internal Server Error"),
            _ => None,
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_reason_phrases() {
        assert_eq!(StatusCode::OK.reason_phrase(), Some("OK"));
        assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), Some("Bad Request"));
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
            Some("Internal Server Error")
        );
    }

    #[test]
    fn unknown_code_has_no_reason_phrase() {
        assert_eq!(StatusCode(418).reason_phrase(), None);
    }
}
