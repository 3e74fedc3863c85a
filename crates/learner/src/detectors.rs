//! Page-content detectors.
//!
//! Static marker tables scanned against lowercased page markup. Order
//! matters for CAPTCHA classification: vendor-specific markers are probed
//! before the generic catch-all.

use challenger_core_types::CaptchaKind;

static RECAPTCHA_MARKERS: &[&str] = &[
    "www.google.com/recaptcha",
    "recaptcha/api.js",
    "g-recaptcha",
    "recaptcha/api2/anchor",
];

static HCAPTCHA_MARKERS: &[&str] = &["hcaptcha.com", "h-captcha"];

static CLOUDFLARE_MARKERS: &[&str] = &[
    "cf-turnstile",
    "challenges.cloudflare.com",
    "checking your browser before accessing",
];

static GENERIC_CAPTCHA_MARKERS: &[&str] = &[
    "data-sitekey",
    "captcha",
    "verify you are human",
    "prove you are human",
];

static ACCOUNT_MARKERS: &[&str] = &[
    "log in to your account",
    "login to your account",
    "sign in to continue",
    "sign in to your account",
    "create an account",
    "register to continue",
    "you must be logged in",
    "forgotten your password",
];

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

/// Classify the CAPTCHA protection visible in the page markup.
pub fn detect_captcha(html: &str) -> CaptchaKind {
    let lowered = html.to_lowercase();
    if contains_any(&lowered, RECAPTCHA_MARKERS) {
        CaptchaKind::Recaptcha
    } else if contains_any(&lowered, HCAPTCHA_MARKERS) {
        CaptchaKind::Hcaptcha
    } else if contains_any(&lowered, CLOUDFLARE_MARKERS) {
        CaptchaKind::Cloudflare
    } else if contains_any(&lowered, GENERIC_CAPTCHA_MARKERS) {
        CaptchaKind::Unknown
    } else {
        CaptchaKind::None
    }
}

/// Whether the portal gates the challenge form behind an account.
pub fn detect_account_requirement(html: &str) -> bool {
    let lowered = html.to_lowercase();
    contains_any(&lowered, ACCOUNT_MARKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_recaptcha_before_generic() {
        let html = r#"<script src="https://www.google.com/recaptcha/api.js"></script>
                      <div class="g-recaptcha" data-sitekey="abc"></div>"#;
        assert_eq!(detect_captcha(html), CaptchaKind::Recaptcha);
    }

    #[test]
    fn classifies_hcaptcha_and_turnstile() {
        assert_eq!(
            detect_captcha(r#"<div class="h-captcha" data-sitekey="x"></div>"#),
            CaptchaKind::Hcaptcha
        );
        assert_eq!(
            detect_captcha(r#"<div class="cf-turnstile"></div>"#),
            CaptchaKind::Cloudflare
        );
    }

    #[test]
    fn unknown_widget_with_sitekey_only() {
        assert_eq!(
            detect_captcha(r#"<div data-sitekey="zzz"></div>"#),
            CaptchaKind::Unknown
        );
    }

    #[test]
    fn plain_form_has_no_captcha() {
        assert_eq!(
            detect_captcha("<form><input id='pcn'></form>"),
            CaptchaKind::None
        );
    }

    #[test]
    fn account_gating_detection() {
        assert!(detect_account_requirement(
            "<p>Please <a href='/login'>sign in to continue</a></p>"
        ));
        assert!(!detect_account_requirement(
            "<form><input id='pcn'></form>"
        ));
    }
}
