//! Markdown to block tree.
//!
//! Walks pulldown-cmark events once and emits one [`Block`] per heading,
//! paragraph, list item or blockquote. List and quote containers never emit
//! a block themselves; their content lands in the item or quote block.
//! Raw HTML keeps its text: tags are stripped and the content becomes a
//! body paragraph.

use std::sync::OnceLock;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

/// A contiguous span of text sharing one set of formatting flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Run { text: String, bold: bool, italic: bool },
    Break,
}

impl Inline {
    pub fn plain(text: impl Into<String>) -> Self {
        Inline::Run {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Heading level 1..=6.
    Heading(u8),
    Paragraph,
    /// `marker` is `•` or `N.`; `None` continues an item after a nested list.
    ListItem { depth: usize, marker: Option<String> },
    Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub inlines: Vec<Inline>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            inlines: Vec::new(),
        }
    }

    fn has_text(&self) -> bool {
        self.inlines
            .iter()
            .any(|inline| matches!(inline, Inline::Run { text, .. } if !text.trim().is_empty()))
    }

    /// Reading-order text, line breaks as `\n`.
    pub fn text(&self) -> String {
        self.inlines
            .iter()
            .map(|inline| match inline {
                Inline::Run { text, .. } => text.as_str(),
                Inline::Break => "\n",
            })
            .collect()
    }
}

pub const BULLET: &str = "\u{2022}";

enum Frame {
    Paragraph,
    Heading,
    Quote,
    List,
    Item,
    Emphasis,
    Strong,
    CodeBlock,
    HtmlBlock,
    Other,
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("html tag regex"))
}

fn is_line_break_tag(html: &str) -> bool {
    let tag = html.trim().trim_start_matches('<').trim_end_matches('>');
    let tag = tag.trim_end_matches('/').trim();
    tag.eq_ignore_ascii_case("br")
}

/// Text content of an HTML fragment with common entities decoded.
fn html_text(html: &str) -> String {
    tag_regex()
        .replace_all(html, " ")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    current: Option<Block>,
    frames: Vec<Frame>,
    /// Next ordinal per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    items: usize,
    quotes: usize,
    bold: usize,
    italic: usize,
}

impl BlockBuilder {
    fn flush(&mut self) {
        if let Some(mut block) = self.current.take() {
            while matches!(block.inlines.last(), Some(Inline::Break)) {
                block.inlines.pop();
            }
            if block.has_text() {
                self.blocks.push(block);
            }
        }
    }

    fn in_container(&self) -> bool {
        self.items > 0 || self.quotes > 0
    }

    fn current_block(&mut self) -> &mut Block {
        if self.current.is_none() {
            let kind = if self.items > 0 {
                BlockKind::ListItem {
                    depth: self.lists.len().saturating_sub(1),
                    marker: None,
                }
            } else if self.quotes > 0 {
                BlockKind::Quote
            } else {
                BlockKind::Paragraph
            };
            self.current = Some(Block::new(kind));
        }
        self.current.get_or_insert_with(|| Block::new(BlockKind::Paragraph))
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let bold = self.bold > 0;
        let italic = self.italic > 0;
        let block = self.current_block();

        // Adjacent text events with the same formatting form a single run.
        if let Some(Inline::Run {
            text: last,
            bold: b,
            italic: i,
        }) = block.inlines.last_mut()
        {
            if *b == bold && *i == italic {
                last.push_str(text);
                return;
            }
        }
        block.inlines.push(Inline::Run {
            text: text.to_string(),
            bold,
            italic,
        });
    }

    fn push_break(&mut self) {
        let block = self.current_block();
        if !block.inlines.is_empty() {
            block.inlines.push(Inline::Break);
        }
    }

    fn push_code_text(&mut self, text: &str) {
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            self.push_text(line);
            if lines.peek().is_some_and(|next| !next.is_empty()) {
                self.push_break();
            }
        }
    }

    /// One line (or chunk) of a raw HTML block.
    fn push_html(&mut self, html: &str) {
        let text = html_text(html);
        if text.is_empty() {
            return;
        }
        if self.current.as_ref().is_some_and(Block::has_text) {
            self.push_break();
        }
        self.push_text(&text);
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => {
                if self.in_container() {
                    if self.current.as_ref().is_some_and(Block::has_text) {
                        self.push_break();
                    }
                } else {
                    self.flush();
                }
                Frame::Paragraph
            }
            Tag::Heading { level, .. } => {
                self.flush();
                self.current = Some(Block::new(BlockKind::Heading(heading_level(level))));
                Frame::Heading
            }
            Tag::BlockQuote(_) => {
                if self.items == 0 && self.quotes == 0 {
                    self.flush();
                }
                self.quotes += 1;
                Frame::Quote
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
                Frame::List
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}.", n);
                        *n += 1;
                        marker
                    }
                    _ => BULLET.to_string(),
                };
                self.items += 1;
                self.current = Some(Block::new(BlockKind::ListItem {
                    depth,
                    marker: Some(marker),
                }));
                Frame::Item
            }
            Tag::CodeBlock(_) => {
                if self.in_container() {
                    if self.current.as_ref().is_some_and(Block::has_text) {
                        self.push_break();
                    }
                } else {
                    self.flush();
                }
                Frame::CodeBlock
            }
            Tag::HtmlBlock => {
                if self.in_container() {
                    if self.current.as_ref().is_some_and(Block::has_text) {
                        self.push_break();
                    }
                } else {
                    self.flush();
                }
                Frame::HtmlBlock
            }
            Tag::Emphasis => {
                self.italic += 1;
                Frame::Emphasis
            }
            Tag::Strong => {
                self.bold += 1;
                Frame::Strong
            }
            _ => Frame::Other,
        };
        self.frames.push(frame);
    }

    fn end(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        match frame {
            Frame::Paragraph | Frame::CodeBlock | Frame::HtmlBlock => {
                if !self.in_container() {
                    self.flush();
                }
            }
            Frame::Heading => self.flush(),
            Frame::Quote => {
                self.quotes = self.quotes.saturating_sub(1);
                if self.items == 0 && self.quotes == 0 {
                    self.flush();
                }
            }
            Frame::List => {
                self.flush();
                self.lists.pop();
            }
            Frame::Item => {
                self.flush();
                self.items = self.items.saturating_sub(1);
            }
            Frame::Emphasis => self.italic = self.italic.saturating_sub(1),
            Frame::Strong => self.bold = self.bold.saturating_sub(1),
            Frame::Other => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Parse markdown into blocks in document order.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    let mut code_depth = 0usize;

    for event in Parser::new_ext(markdown, Options::empty()) {
        match event {
            Event::Start(tag) => {
                if matches!(tag, Tag::CodeBlock(_)) {
                    code_depth += 1;
                }
                builder.start(tag);
            }
            Event::End(_) => {
                if matches!(builder.frames.last(), Some(Frame::CodeBlock)) {
                    code_depth = code_depth.saturating_sub(1);
                }
                builder.end();
            }
            Event::Text(text) if code_depth > 0 => builder.push_code_text(&text),
            Event::Text(text) | Event::Code(text) => builder.push_text(&text),
            Event::SoftBreak | Event::HardBreak => builder.push_break(),
            Event::Html(html) => builder.push_html(&html),
            Event::InlineHtml(html) if is_line_break_tag(&html) => builder.push_break(),
            _ => {}
        }
    }

    builder.finish()
}

/// Blocks for `markdown`, degrading to one plain paragraph per non-blank
/// line when parsing yields nothing.
pub fn blocks_or_raw_lines(markdown: &str) -> Vec<Block> {
    let blocks = parse_blocks(markdown);
    if !blocks.is_empty() || markdown.trim().is_empty() {
        return blocks;
    }

    log::warn!("markdown produced no blocks; emitting raw lines");
    markdown
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(|line| Block {
            kind: BlockKind::Paragraph,
            inlines: vec![Inline::plain(line)],
        })
        .collect()
}
