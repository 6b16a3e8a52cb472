use tracing::debug;

use super::{DASHBOARD_PATH, LOGIN_PATH, PathClass};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    Redirect(String),
}

/// Gates navigation on local credential presence. The token itself is not
/// validated here; an expired server-side session surfaces on the first
/// authenticated request instead.
#[derive(Clone)]
pub struct RouteGuard {
    session: Session,
}

impl RouteGuard {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// `target` is a path with an optional query string.
    pub fn check(&self, target: &str) -> GuardDecision {
        let decision = Self::decide(target, self.session.is_authenticated());
        if let GuardDecision::Redirect(to) = &decision {
            debug!(from = %target, to = %to, "Route redirected");
        }
        decision
    }

    pub fn decide(target: &str, authenticated: bool) -> GuardDecision {
        let target = target.split('#').next().unwrap_or_default();
        let path = target.split('?').next().unwrap_or_default();

        match (authenticated, PathClass::of(path)) {
            // Signed in users never see the auth pages; the query is dropped.
            (true, PathClass::Auth) => GuardDecision::Redirect(DASHBOARD_PATH.to_string()),
            (false, PathClass::Protected) => GuardDecision::Redirect(format!(
                "{}?next={}",
                LOGIN_PATH,
                urlencoding::encode(target)
            )),
            _ => GuardDecision::Pass,
        }
    }

    /// Raw `next` value from a login URL such as `/auth/login?next=%2Fassets`.
    pub fn next_param(target: &str) -> Option<&str> {
        let (_, query) = target.split_once('?')?;
        query
            .split('&')
            .find_map(|pair| pair.strip_prefix("next="))
            .filter(|value| !value.is_empty())
    }

    /// Where to land after signing in: the decoded `next` hint when it is a
    /// local, non-auth path, otherwise the dashboard.
    pub fn post_login_destination(next: Option<&str>) -> String {
        next.and_then(|raw| urlencoding::decode(raw).ok())
            .map(|decoded| decoded.into_owned())
            .filter(|path| {
                path.starts_with('/')
                    && !path.starts_with("//")
                    && PathClass::of(path) != PathClass::Auth
            })
            .unwrap_or_else(|| DASHBOARD_PATH.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/auth/login?next=%2Fprojects", true, GuardDecision::Redirect("/dashboard".to_string()))]
    #[case("/auth/signup", true, GuardDecision::Redirect("/dashboard".to_string()))]
    #[case("/auth/login", false, GuardDecision::Pass)]
    #[case("/projects/5?tab=assets", false, GuardDecision::Redirect("/auth/login?next=%2Fprojects%2F5%3Ftab%3Dassets".to_string()))]
    #[case("/dashboard", false, GuardDecision::Redirect("/auth/login?next=%2Fdashboard".to_string()))]
    #[case("/assets", true, GuardDecision::Pass)]
    #[case("/", false, GuardDecision::Pass)]
    #[case("/", true, GuardDecision::Pass)]
    fn test_decide(#[case] target: &str, #[case] authenticated: bool, #[case] expected: GuardDecision) {
        assert_eq!(RouteGuard::decide(target, authenticated), expected);
    }

    #[test]
    fn test_check_reads_session() {
        let session = Session::in_memory();
        let guard = RouteGuard::new(session.clone());
        assert!(matches!(guard.check("/assets/3"), GuardDecision::Redirect(_)));

        session.init("tok").unwrap();
        assert_eq!(guard.check("/assets/3"), GuardDecision::Pass);
        assert_eq!(
            guard.check("/auth/login"),
            GuardDecision::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn test_next_round_trip() {
        let GuardDecision::Redirect(login) = RouteGuard::decide("/projects/5?tab=assets", false) else {
            panic!("expected redirect");
        };
        let next = RouteGuard::next_param(&login);
        assert_eq!(RouteGuard::post_login_destination(next), "/projects/5?tab=assets");
    }

    #[rstest]
    #[case(None, "/dashboard")]
    #[case(Some("%2Fassets%2F2"), "/assets/2")]
    #[case(Some("https%3A%2F%2Fevil.example"), "/dashboard")]
    #[case(Some("%2F%2Fevil.example"), "/dashboard")]
    #[case(Some("%2Fauth%2Flogin"), "/dashboard")]
    fn test_post_login_destination(#[case] next: Option<&str>, #[case] expected: &str) {
        assert_eq!(RouteGuard::post_login_destination(next), expected);
    }
}
