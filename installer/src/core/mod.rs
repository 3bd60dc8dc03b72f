pub mod app_dirs;
pub mod path_utils;
pub mod roots;
