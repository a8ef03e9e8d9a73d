//! 自动登录 - 业务能力层

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::infrastructure::PageSurface;
use crate::models::Credentials;

pub const USERNAME_SELECTORS: &[&str] = &["#id_login", r#"input[name="login"]"#];
pub const PASSWORD_SELECTORS: &[&str] = &["#id_password", r#"input[name="password"]"#];
pub const SIGN_IN_SELECTORS: &[&str] = &["#signin_btn", r#"button[type="submit"]"#];

/// 登录结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// 未保存凭据
    NoCredentials,
    /// 表单元素不全
    FormNotFound,
    /// 已提交登录表单
    Submitted,
}

/// 第一个存在的选择器
async fn first_present(surface: &dyn PageSurface, selectors: &[&'static str]) -> Result<Option<&'static str>> {
    for selector in selectors {
        if surface.has_element(selector).await? {
            return Ok(Some(*selector));
        }
    }
    Ok(None)
}

/// 填写并提交登录表单
pub async fn auto_login(
    surface: &dyn PageSurface,
    credentials: &Credentials,
    click_delay: Duration,
) -> Result<LoginOutcome> {
    let Some((username, password)) = credentials.pair() else {
        debug!("未保存登录凭据，跳过自动登录");
        return Ok(LoginOutcome::NoCredentials);
    };

    let user_field = first_present(surface, USERNAME_SELECTORS).await?;
    let pass_field = first_present(surface, PASSWORD_SELECTORS).await?;
    let button = first_present(surface, SIGN_IN_SELECTORS).await?;

    let (Some(user_field), Some(pass_field), Some(button)) = (user_field, pass_field, button) else {
        debug!("登录表单不完整，跳过自动登录");
        return Ok(LoginOutcome::FormNotFound);
    };

    surface.fill_input(user_field, username).await?;
    surface.fill_input(pass_field, password).await?;

    tokio::time::sleep(click_delay).await;
    surface.click(button).await?;
    info!("🔑 已提交登录表单");
    Ok(LoginOutcome::Submitted)
}
