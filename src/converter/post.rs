use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{bail, Context as _};
use chrono::{DateTime, Local, NaiveDate};
use regex::{Regex, RegexBuilder};

use super::hugo::{hugo_link, markdown_title, reference_list, slug, FrontMatter, RenderOptions};

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[\[(.*?)(?:\|(.*?))?\]\])").unwrap());

// A line consisting of a bare image filename, optionally followed by a caption.
static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"^(([a-z0-9_-]+\.(?:png|jpe?g))(?:\s+"?(.*?)"?)?)\s*?$"#)
        .multi_line(true)
        .case_insensitive(true)
        .build()
        .unwrap()
});

// Leading metadata block delimited by `---` lines.
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^---\r?\n(.*?)---\r?\n(.*)")
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});

static DATED_STEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})[-_\s]+(.*)$").unwrap());

/// An internal link between Markdown documents: `[[Name]]` or `[[Name|alias]]`.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct Link {
    pub text: String,
    pub name: String,
    pub alias: Option<String>,
}

impl Link {
    /// The link's title as it should appear on the web page.
    pub fn title(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn slug(&self) -> String {
        slug(&self.name)
    }
}

/// An image reference from a Markdown document.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct Image {
    pub text: String,
    pub file: String,
    pub caption: String,
}

pub(super) fn links_from(body: &str) -> Vec<Link> {
    LINK.captures_iter(body)
        .map(|caps| Link {
            text: caps[1].to_string(),
            name: caps[2].to_string(),
            alias: caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .filter(|a| !a.is_empty()),
        })
        .collect()
}

pub(super) fn images_from(body: &str) -> Vec<Image> {
    IMAGE
        .captures_iter(body)
        .map(|caps| Image {
            text: caps[1].to_string(),
            file: caps[2].to_string(),
            caption: caps.get(3).map_or(String::new(), |m| m.as_str().to_string()),
        })
        .collect()
}

#[derive(Debug, Default)]
pub(super) struct Header {
    pub title: Option<String>,
    pub tags: Vec<String>,
    pub date: Option<NaiveDate>,
}

fn parse_header(content: &str) -> anyhow::Result<(Header, String)> {
    let Some(caps) = HEADER.captures(content) else {
        return Ok((Header::default(), content.to_string()));
    };

    let mut header = Header::default();
    for line in caps[1].lines() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            bail!("Invalid header: {}", line);
        };
        let value = value.trim();
        // currently, title, tags and date are supported
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => header.title = Some(value.to_string()),
            "tags" | "tag" => {
                header.tags = value
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            "date" => {
                header.date = Some(
                    NaiveDate::parse_from_str(value, "%Y-%m-%d").context("Invalid date format")?,
                );
            }
            _ => {}
        }
    }

    Ok((header, caps[2].to_string()))
}

fn dated_stem(stem: &str) -> (Option<NaiveDate>, &str) {
    if let Some(caps) = DATED_STEM.captures(stem) {
        if let Ok(date) = NaiveDate::parse_from_str(caps.get(1).unwrap().as_str(), "%Y-%m-%d") {
            return (Some(date), caps.get(2).unwrap().as_str());
        }
    }
    (None, stem)
}

/// A Markdown post, as stored in iA Writer.
#[derive(Debug)]
pub(super) struct Post {
    path: PathBuf,
    header: Header,
    body: String,
    modified: NaiveDate,
}

impl Post {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("while reading {:?}", path))?;
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("while reading metadata of {:?}", path))?;
        let (header, body) =
            parse_header(&raw).with_context(|| format!("while parsing header of {:?}", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            header,
            body,
            modified: DateTime::<Local>::from(modified).date_naive(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The post's human-friendly title: metadata header, leading title
    /// line, or the file name as a last resort.
    pub fn title(&self) -> String {
        if let Some(title) = &self.header.title {
            return title.clone();
        }
        if self.body.starts_with('#') {
            if let Some(line) = self.body.lines().next() {
                return line.trim_start_matches('#').trim().to_string();
            }
        }
        let stem = self.stem();
        let (_, title) = dated_stem(&stem);
        title.to_string()
    }

    /// The post's date: metadata header, `YYYY-MM-DD` file name prefix,
    /// or the file's modification date.
    pub fn date(&self) -> NaiveDate {
        if let Some(date) = self.header.date {
            return date;
        }
        let stem = self.stem();
        if let (Some(date), _) = dated_stem(&stem) {
            return date;
        }
        self.modified
    }

    /// The Hugo-formatted version of the post's contents.
    pub fn as_hugo(&self, refs: &BTreeSet<String>, opts: &RenderOptions) -> String {
        let title = self.title();

        let mut body = self.body.trim().to_string();
        if body.is_empty() {
            body = opts.empty_body_text.to_string();
        }

        for link in links_from(&body) {
            body = body.replace(
                &link.text,
                &hugo_link(link.title(), &link.slug(), opts.ref_base),
            );
        }

        for image in images_from(&body) {
            body = body.replace(&image.text, &format!("![{}](/{})", image.caption, image.file));
        }

        if !body.starts_with('#') {
            body = format!("{}{}", markdown_title(&title), body);
        }

        let front = FrontMatter {
            title: title.clone(),
            date: Some(self.date()),
            slug: slug(&title),
            tags: self.header.tags.clone(),
        };
        format!(
            "{}{}{}",
            front.render(),
            body,
            reference_list(refs, opts.ref_base)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(path: &str, header: Header, body: &str) -> Post {
        Post {
            path: PathBuf::from(path),
            header,
            body: body.to_string(),
            modified: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
        }
    }

    fn opts() -> RenderOptions<'static> {
        RenderOptions {
            empty_body_text: "*No content yet.*",
            ref_base: "/docs",
        }
    }

    #[test]
    fn links_with_and_without_alias() {
        let links = links_from("See [[Old Design|the old design]] and [[Roadmap]].");
        assert_eq!(
            links,
            vec![
                Link {
                    text: "[[Old Design|the old design]]".to_string(),
                    name: "Old Design".to_string(),
                    alias: Some("the old design".to_string()),
                },
                Link {
                    text: "[[Roadmap]]".to_string(),
                    name: "Roadmap".to_string(),
                    alias: None,
                },
            ]
        );
        assert_eq!(links[0].title(), "the old design");
        assert_eq!(links[0].slug(), "old_design");
        assert_eq!(links[1].title(), "Roadmap");
    }

    #[test]
    fn link_with_empty_alias_falls_back_to_name() {
        let links = links_from("[[Roadmap|]]");
        assert_eq!(links[0].title(), "Roadmap");
    }

    #[test]
    fn images_on_their_own_line() {
        let images = images_from("Intro.\n\nshot.png \"Launch day\"\nplain.jpeg\n");
        assert_eq!(
            images,
            vec![
                Image {
                    text: "shot.png \"Launch day\"".to_string(),
                    file: "shot.png".to_string(),
                    caption: "Launch day".to_string(),
                },
                Image {
                    // a bare filename line matches up to the newline
                    text: "plain.jpeg\n".to_string(),
                    file: "plain.jpeg".to_string(),
                    caption: String::new(),
                },
            ]
        );
    }

    #[test]
    fn bare_image_line_takes_following_line_as_caption() {
        // `\s+` before the caption also matches a newline, so a bare
        // filename line followed by text treats that text as the caption
        let images = images_from("plain.jpeg\nSome text\n");
        assert_eq!(
            images,
            vec![Image {
                text: "plain.jpeg\nSome text".to_string(),
                file: "plain.jpeg".to_string(),
                caption: "Some text".to_string(),
            }]
        );
    }

    #[test]
    fn unquoted_captions_are_kept() {
        let images = images_from("photo.jpg My caption\n");
        assert_eq!(images[0].caption, "My caption");
    }

    #[test]
    fn inline_image_mentions_are_ignored() {
        assert!(images_from("see shot.png for details\n").is_empty());
    }

    #[test]
    fn header_block_is_parsed() {
        let (header, body) =
            parse_header("---\ntitle: Quarterly Plan\ntags: work, planning\ndate: 2024-03-01\n---\nBody text.\n")
                .unwrap();
        assert_eq!(header.title.as_deref(), Some("Quarterly Plan"));
        assert_eq!(header.tags, vec!["work", "planning"]);
        assert_eq!(header.date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(body, "Body text.\n");
    }

    #[test]
    fn header_keys_are_case_insensitive() {
        let (header, _) = parse_header("---\nTitle: Hi\nTags: a\n---\nx").unwrap();
        assert_eq!(header.title.as_deref(), Some("Hi"));
        assert_eq!(header.tags, vec!["a"]);
    }

    #[test]
    fn singular_tag_key_is_accepted() {
        let (header, _) = parse_header("---\ntag: work, planning\n---\nx").unwrap();
        assert_eq!(header.tags, vec!["work", "planning"]);
    }

    #[test]
    fn missing_header_means_all_body() {
        let (header, body) = parse_header("# Just a title\n\nText.\n").unwrap();
        assert!(header.title.is_none());
        assert_eq!(body, "# Just a title\n\nText.\n");
    }

    #[test]
    fn header_line_without_colon_is_rejected() {
        assert!(parse_header("---\nnot a key value line\n---\nx").is_err());
    }

    #[test]
    fn bad_header_date_is_rejected() {
        assert!(parse_header("---\ndate: yesterday\n---\nx").is_err());
    }

    #[test]
    fn title_prefers_header_over_heading() {
        let header = Header {
            title: Some("From Header".to_string()),
            ..Header::default()
        };
        let p = post("notes.md", header, "# From Heading\n");
        assert_eq!(p.title(), "From Header");
    }

    #[test]
    fn title_from_leading_heading() {
        let p = post("notes.md", Header::default(), "## Deep Dive\n\nText.\n");
        assert_eq!(p.title(), "Deep Dive");
    }

    #[test]
    fn title_from_file_stem_strips_date_prefix() {
        let p = post("2024-05-01-Release Notes.md", Header::default(), "Plain text.\n");
        assert_eq!(p.title(), "Release Notes");

        let p = post("Release Notes.md", Header::default(), "Plain text.\n");
        assert_eq!(p.title(), "Release Notes");
    }

    #[test]
    fn date_precedence() {
        let header = Header {
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Header::default()
        };
        let p = post("2024-05-01-x.md", header, "");
        assert_eq!(p.date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let p = post("2024-05-01-x.md", Header::default(), "");
        assert_eq!(p.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        let p = post("x.md", Header::default(), "");
        assert_eq!(p.date(), NaiveDate::from_ymd_opt(2020, 6, 15).unwrap());
    }

    #[test]
    fn as_hugo_rewrites_links_and_images() {
        let p = post(
            "Gallery.md",
            Header::default(),
            "# Gallery\n\nSee [[Old Design|the old design]].\n\nshot.png \"Launch day\"\n",
        );
        assert_eq!(
            p.as_hugo(&BTreeSet::new(), &opts()),
            "---\ntitle: \"Gallery\"\ndate: 2020-06-15\nslug: \"gallery\"\n---\n\
             # Gallery\n\n\
             See [the old design]({{< ref \"/docs/old_design\" >}}).\n\n\
             ![Launch day](/shot.png)"
        );
    }

    #[test]
    fn as_hugo_prepends_missing_title_heading() {
        let p = post("Plain Note.md", Header::default(), "Just some text.\n");
        let out = p.as_hugo(&BTreeSet::new(), &opts());
        assert!(out.ends_with("# Plain Note\n\nJust some text."));
    }

    #[test]
    fn as_hugo_substitutes_empty_body() {
        let p = post("Stub.md", Header::default(), "\n");
        let out = p.as_hugo(&BTreeSet::new(), &opts());
        assert!(out.ends_with("# Stub\n\n*No content yet.*"));
    }

    #[test]
    fn as_hugo_appends_reference_list() {
        let p = post("Roadmap.md", Header::default(), "# Roadmap\n\nText.\n");
        let refs: BTreeSet<String> = ["Alpha Release".to_string()].into();
        let out = p.as_hugo(&refs, &opts());
        assert!(out.ends_with(
            "\n\n---\n## References\n- [Alpha Release]({{< ref \"/docs/alpha_release\" >}})\n"
        ));
    }
}
