mod common;
mod media;
