use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use log::{debug, info, warn};

use crate::context::Context;

use self::hugo::{fake_post, slug, RenderOptions};
use self::post::{images_from, links_from, Post};

mod hugo;
mod post;

pub(crate) fn run() -> anyhow::Result<()> {
    let ctx = Context::instance();
    let opts = RenderOptions {
        empty_body_text: &ctx.empty_body_text,
        ref_base: &ctx.ref_base,
    };

    // First, load the Markdown files and build a map of references between them.
    let mut posts: BTreeMap<String, Post> = BTreeMap::new();
    let mut refs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for path in scan_markdown(&ctx.writer_post_dir, ctx.recursive)? {
        let post = Post::load(&path)?;
        let title = post.title();
        for link in links_from(post.body()) {
            refs.entry(link.name).or_default().insert(title.clone());
        }
        if let Some(old) = posts.insert(slug(&title), post) {
            warn!("{:?} shadows {:?} (same slug)", path, old.path());
        }
    }

    // Next, write out the existing posts in Hugo format.
    for post in posts.values() {
        let title = post.title();
        for image in images_from(post.body()) {
            copy_image(&image.file)?;
        }
        let post_file = post_path(&slug(&title))?;
        let post_refs = refs.get(&title).cloned().unwrap_or_default();
        info!("Writing {:?} to {:?} with refs {:?}", title, post_file, post_refs);
        fs::write(&post_file, post.as_hugo(&post_refs, &opts))
            .with_context(|| format!("while writing {:?}", post_file))?;
    }

    // Finally, make placeholder posts for pages that were referred
    // to but that don't already exist.
    for (title, post_refs) in &refs {
        let post_slug = slug(title);
        if posts.contains_key(&post_slug) {
            continue;
        }
        let post_file = post_path(&post_slug)?;
        info!(
            "Writing placeholder {:?} to {:?} because of {:?}",
            title, post_file, post_refs
        );
        fs::write(&post_file, fake_post(title, post_refs, &opts))
            .with_context(|| format!("while writing {:?}", post_file))?;
    }

    Ok(())
}

fn scan_markdown(dir: &Path, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = vec![];
    let mut q = VecDeque::new();
    q.push_back(dir.to_path_buf());
    while let Some(current) = q.pop_front() {
        for entry in
            fs::read_dir(&current).with_context(|| format!("while reading {:?}", current))?
        {
            let entry = entry?;
            // symlinked directories are not descended into, so a link
            // cycle cannot loop the scan
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                if recursive {
                    q.push_back(path);
                }
            } else if path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("md"))
                && path.is_file()
            {
                files.push(path);
            }
        }
    }
    // read_dir order is platform-dependent
    files.sort();
    Ok(files)
}

fn post_path(post_slug: &str) -> anyhow::Result<PathBuf> {
    let dir = Context::instance().hugo_post_dir.join(post_slug);
    fs::create_dir_all(&dir).with_context(|| format!("while creating {:?}", dir))?;
    Ok(dir.join("index.md"))
}

/// Copy the named image from iA Writer to Hugo, unless the copy is already current.
fn copy_image(name: &str) -> anyhow::Result<()> {
    let ctx = Context::instance();
    let src = ctx.writer_image_dir.join(name);
    let dest = ctx.hugo_image_dir.join(name);

    let src_modified = fs::metadata(&src)
        .and_then(|m| m.modified())
        .with_context(|| format!("while reading image {:?}", src))?;
    if let Ok(meta) = fs::metadata(&dest) {
        if meta.modified()? >= src_modified {
            debug!("{:?} is up to date", dest);
            return Ok(());
        }
    }

    debug!("Copying {:?} to {:?}", src, dest);
    fs::copy(&src, &dest).with_context(|| format!("while copying {:?} to {:?}", src, dest))?;
    Ok(())
}
