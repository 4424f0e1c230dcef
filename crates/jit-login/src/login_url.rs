//! Login and redirect URLs on the broker's web app.

/// Path of the broker page that hands a token to a local app.
pub const VERIFY_TOKEN_PATH: &str = "/app/user/verify-token";

fn verify_token_url(base_url: &str, app_name: &str, port: u16, admin: bool, flag: &str) -> String {
    let admin_flag = if admin { "&isAdmin=true" } else { "" };
    format!(
        "{}{}?localAppName={}&localPort={}{}&{}=true",
        base_url,
        VERIFY_TOKEN_PATH,
        urlencoding::encode(app_name),
        port,
        admin_flag,
        flag
    )
}

/// URL opened in the browser to start the login.
pub fn build_login_url(base_url: &str, app_name: &str, port: u16, admin: bool) -> String {
    verify_token_url(base_url, app_name, port, admin, "redirect")
}

/// URL the browser is sent back to once the query-token callback succeeds.
pub fn build_redirect_url(base_url: &str, app_name: &str, port: u16, admin: bool) -> String {
    verify_token_url(base_url, app_name, port, admin, "success")
}
