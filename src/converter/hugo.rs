use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::NaiveDate;

pub(super) struct RenderOptions<'a> {
    pub empty_body_text: &'a str,
    pub ref_base: &'a str,
}

/// Front matter of a generated post, rendered as YAML with a fixed key
/// order so repeated runs produce identical bytes.
pub(super) struct FrontMatter {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub slug: String,
    pub tags: Vec<String>,
}

impl FrontMatter {
    pub fn render(&self) -> String {
        let mut text = String::from("---\n");
        let _ = writeln!(text, "title: {}", yaml_quote(&self.title));
        if let Some(date) = self.date {
            let _ = writeln!(text, "date: {}", date.format("%Y-%m-%d"));
        }
        let _ = writeln!(text, "slug: {}", yaml_quote(&self.slug));
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|t| yaml_quote(t)).collect();
            let _ = writeln!(text, "tags: [{}]", tags.join(", "));
        }
        text.push_str("---\n");
        text
    }
}

fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Convert a post's title into a reasonable URL slug.
pub(super) fn slug(title: &str) -> String {
    let mut slug: String = title
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '’' | '.'))
        .collect();
    slug = slug.replace(' ', "_");
    while slug.contains("__") {
        slug = slug.replace("__", "_");
    }
    slug
}

/// Hugo-flavored Markdown link to the article with the given slug.
pub(super) fn hugo_link(title: &str, slug: &str, ref_base: &str) -> String {
    format!("[{title}]({{{{< ref \"{ref_base}/{slug}\" >}}}})")
}

pub(super) fn markdown_title(title: &str) -> String {
    format!("# {title}\n\n")
}

/// Markdown block listing the posts that refer to this one.
pub(super) fn reference_list(refs: &BTreeSet<String>, ref_base: &str) -> String {
    if refs.is_empty() {
        return String::new();
    }

    let mut text = String::from("\n\n---\n## References\n");
    for ref_title in refs {
        let _ = writeln!(text, "- {}", hugo_link(ref_title, &slug(ref_title), ref_base));
    }
    text
}

/// An empty placeholder post in the same format as a real one.
pub(super) fn fake_post(title: &str, refs: &BTreeSet<String>, opts: &RenderOptions) -> String {
    let front = FrontMatter {
        title: title.to_string(),
        date: None,
        slug: slug(title),
        tags: vec![],
    };
    format!(
        "{}{}{}{}",
        front.render(),
        markdown_title(title),
        opts.empty_body_text,
        reference_list(refs, opts.ref_base)
    )
}
