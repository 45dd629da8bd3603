use std::{path::PathBuf, sync::OnceLock};

use crate::config::Config;

#[derive(Debug)]
pub(crate) struct Context {
    pub writer_post_dir: PathBuf,
    pub writer_image_dir: PathBuf,
    pub hugo_post_dir: PathBuf,
    pub hugo_image_dir: PathBuf,

    pub empty_body_text: String,
    pub ref_base: String,
    pub recursive: bool,
}

static CONTEXT: OnceLock<Context> = OnceLock::new();

impl Context {
    pub fn init(config: Config) {
        CONTEXT
            .set(Self {
                writer_post_dir: config.writer_post_dir,
                writer_image_dir: config.writer_image_dir,
                hugo_post_dir: config.hugo_post_dir,
                hugo_image_dir: config.hugo_image_dir,
                empty_body_text: config.empty_body_text,
                ref_base: config.ref_base,
                recursive: config.recursive,
            })
            .unwrap();
    }

    pub fn instance() -> &'static Context {
        CONTEXT.get().unwrap()
    }
}
