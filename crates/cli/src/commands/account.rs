//! `login`, `logout`, `whoami`.

use secrecy::SecretString;

use super::{CliError, Context, out};

pub async fn login(ctx: &Context, email: &str, password: String) -> Result<(), CliError> {
    let session = ctx
        .client
        .login(email, &SecretString::from(password))
        .await?;
    let name = session
        .user
        .name
        .as_deref()
        .unwrap_or(email);
    tracing::info!(user = name, "Signed in");
    out(format!("Đăng nhập thành công: {name}"));
    Ok(())
}

pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.client.logout().await;
    out("Đã đăng xuất");
    Ok(())
}

pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    if !ctx.client.session().is_signed_in().await {
        return Err(CliError::Usage(
            "Chưa đăng nhập. Dùng `mkt login` trước.".to_owned(),
        ));
    }
    let profile = ctx.client.current_user().await?;
    let roles: Vec<String> = profile.roles.iter().map(ToString::to_string).collect();
    out(profile.display_name());
    if let Some(email) = &profile.email {
        out(format!("  Email: {email}"));
    }
    if let Some(phone) = &profile.phone {
        out(format!("  SĐT: {phone}"));
    }
    out(format!("  Vai trò: {}", roles.join(", ")));
    Ok(())
}
