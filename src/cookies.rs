use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponseBuilder};

use crate::config::Environment;

/// Attributes applied to every cookie the service issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
}

/// Default attributes: HTTP-only, strict same-site, 15 minutes, `Secure` in production.
pub fn options(env: Environment) -> CookieOptions {
    CookieOptions {
        http_only: true,
        secure: env.is_production(),
        same_site: SameSite::Strict,
        max_age: Duration::minutes(15),
    }
}

fn build(name: &str, value: &str, opts: CookieOptions) -> Cookie<'static> {
    Cookie::build(name.to_owned(), value.to_owned())
        .path("/")
        .http_only(opts.http_only)
        .secure(opts.secure)
        .same_site(opts.same_site)
        .max_age(opts.max_age)
        .finish()
}

/// Adds `name=value` to the response. Override individual attributes with
/// `CookieOptions { max_age: ..., ..cookies::options(env) }`.
pub fn set(res: &mut HttpResponseBuilder, name: &str, value: &str, opts: CookieOptions) {
    res.cookie(build(name, value, opts));
}

/// Expires the cookie on the client. Attributes must match the ones it was set with.
pub fn clear(res: &mut HttpResponseBuilder, name: &str, opts: CookieOptions) {
    let mut cookie = build(name, "", opts);
    cookie.make_removal();
    res.cookie(cookie);
}

pub fn get(req: &HttpRequest, name: &str) -> Option<String> {
    req.cookie(name).map(|c| c.value().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use actix_web::HttpResponse;

    #[test]
    fn secure_only_in_production() {
        assert!(options(Environment::Production).secure);
        assert!(!options(Environment::Development).secure);
        let o = options(Environment::Test);
        assert!(o.http_only);
        assert_eq!(o.same_site, SameSite::Strict);
        assert_eq!(o.max_age, Duration::minutes(15));
    }

    #[test]
    fn set_writes_attributes() {
        let mut builder = HttpResponse::Ok();
        set(&mut builder, "token", "abc", options(Environment::Production));
        let res = builder.finish();
        let cookie = res.cookies().find(|c| c.name() == "token").unwrap();
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(Duration::minutes(15)));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut builder = HttpResponse::Ok();
        let opts = CookieOptions { max_age: Duration::days(1), same_site: SameSite::Lax, ..options(Environment::Development) };
        set(&mut builder, "token", "abc", opts);
        let res = builder.finish();
        let cookie = res.cookies().next().unwrap();
        assert_eq!(cookie.max_age(), Some(Duration::days(1)));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.http_only(), Some(true));
    }

    #[test]
    fn clear_expires_cookie() {
        let mut builder = HttpResponse::Ok();
        clear(&mut builder, "token", options(Environment::Development));
        let res = builder.finish();
        let cookie = res.cookies().next().unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn get_reads_request_cookie() {
        let req = TestRequest::default().cookie(Cookie::new("token", "xyz")).to_http_request();
        assert_eq!(get(&req, "token").as_deref(), Some("xyz"));
        assert!(get(&req, "missing").is_none());
    }
}
