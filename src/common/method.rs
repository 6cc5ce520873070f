use axum::routing::MethodFilter;
use strum_macros::{AsRefStr, Display, EnumString};

/// HTTP method a route is declared for.
///
/// `All` matches every method the path has no more specific handler for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    All,
}

impl Method {
    /// The axum filter for this method. `None` for [`Method::All`], which is
    /// bound as the path's method fallback instead.
    pub fn filter(self) -> Option<MethodFilter> {
        match self {
            Method::Get => Some(MethodFilter::GET),
            Method::Post => Some(MethodFilter::POST),
            Method::Put => Some(MethodFilter::PUT),
            Method::Delete => Some(MethodFilter::DELETE),
            Method::Patch => Some(MethodFilter::PATCH),
            Method::Options => Some(MethodFilter::OPTIONS),
            Method::Head => Some(MethodFilter::HEAD),
            Method::All => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_is_uppercase() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Options.as_ref(), "OPTIONS");
        assert_eq!(Method::All.to_string(), "ALL");
    }

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!(Method::from_str("delete").unwrap(), Method::Delete);
        assert_eq!(Method::from_str("Patch").unwrap(), Method::Patch);
        assert!(Method::from_str("TRACE").is_err());
    }

    #[test]
    fn test_all_has_no_filter() {
        assert!(Method::All.filter().is_none());
        assert!(Method::Head.filter().is_some());
    }
}
