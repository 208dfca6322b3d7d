mod common;
mod submit;
