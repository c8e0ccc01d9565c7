//! One-shot notices carried across a redirect in the `flash` cookie.
//!
//! The cookie holds a short code rather than the text, so the value stays a
//! valid cookie token. `GET /` reads the code back and clears the cookie.

use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar};

use warbler_types::api::FlashMessage;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    AccessUnauthorized,
    LoggedOut,
    AccountDeleted,
    MessageDeleted,
}

impl Flash {
    pub fn code(self) -> &'static str {
        match self {
            Flash::AccessUnauthorized => "access_unauthorized",
            Flash::LoggedOut => "logged_out",
            Flash::AccountDeleted => "account_deleted",
            Flash::MessageDeleted => "message_deleted",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "access_unauthorized" => Some(Flash::AccessUnauthorized),
            "logged_out" => Some(Flash::LoggedOut),
            "account_deleted" => Some(Flash::AccountDeleted),
            "message_deleted" => Some(Flash::MessageDeleted),
            _ => None,
        }
    }

    pub fn category(self) -> &'static str {
        match self {
            Flash::AccessUnauthorized => "danger",
            Flash::LoggedOut | Flash::AccountDeleted | Flash::MessageDeleted => "success",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::AccessUnauthorized => "Access unauthorized.",
            Flash::LoggedOut => "You have successfully logged out.",
            Flash::AccountDeleted => "Your account has been deleted.",
            Flash::MessageDeleted => "Message deleted.",
        }
    }
}

impl From<Flash> for FlashMessage {
    fn from(flash: Flash) -> Self {
        FlashMessage {
            category: flash.category().to_string(),
            message: flash.message().to_string(),
        }
    }
}

/// 303 to `to` with `flash` queued for the next page.
pub fn redirect(jar: CookieJar, flash: Flash, to: &str) -> (CookieJar, Redirect) {
    let cookie = Cookie::build((FLASH_COOKIE, flash.code())).path("/");
    (jar.add(cookie), Redirect::to(to))
}

/// Pops the pending flash, if any. Unknown codes are dropped.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::from_code(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}
