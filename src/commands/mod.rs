pub mod classify;
pub mod folders;
pub mod route;
pub mod run;
pub mod tag;
