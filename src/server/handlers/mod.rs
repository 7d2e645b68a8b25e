mod assist;
mod info;
mod session;

pub(crate) use self::assist::{complete, explain};
pub(crate) use self::info::info;
pub(crate) use self::session::session;
