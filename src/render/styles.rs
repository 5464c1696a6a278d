//! Paragraph styles and `word/styles.xml`.

use super::blocks::BlockKind;
use super::docx::{XmlOut, NS_W};
use super::RenderError;

/// Left indent of a top-level list item, in twips.
pub const LIST_INDENT: u32 = 720;
/// Hanging indent that keeps the bullet glyph outside the text column.
pub const LIST_HANGING: u32 = 360;
pub const QUOTE_INDENT: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Title,
    Heading1,
    Heading2,
    Heading3,
    Body,
    ListItem,
    Quote,
}

impl ParagraphStyle {
    /// H1 is the title, H2 and H3 step down one level, everything deeper
    /// shares Heading3.
    pub fn for_block(kind: &BlockKind) -> Self {
        match kind {
            BlockKind::Heading(1) => Self::Title,
            BlockKind::Heading(2) => Self::Heading1,
            BlockKind::Heading(3) => Self::Heading2,
            BlockKind::Heading(_) => Self::Heading3,
            BlockKind::Paragraph => Self::Body,
            BlockKind::ListItem { .. } => Self::ListItem,
            BlockKind::Quote => Self::Quote,
        }
    }

    pub fn style_id(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Heading1 => "Heading1",
            Self::Heading2 => "Heading2",
            Self::Heading3 => "Heading3",
            Self::Body => "Normal",
            Self::ListItem => "ListParagraph",
            Self::Quote => "Quote",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Heading1 => "heading 1",
            Self::Heading2 => "heading 2",
            Self::Heading3 => "heading 3",
            Self::Body => "Normal",
            Self::ListItem => "List Paragraph",
            Self::Quote => "Quote",
        }
    }

    pub const ALL: [ParagraphStyle; 7] = [
        Self::Body,
        Self::Title,
        Self::Heading1,
        Self::Heading2,
        Self::Heading3,
        Self::ListItem,
        Self::Quote,
    ];
}

struct StyleDef {
    /// Half-points.
    size: u32,
    bold: bool,
    italic: bool,
    space_before: u32,
    space_after: u32,
    indent: Option<(u32, u32)>,
}

fn definition(style: ParagraphStyle) -> StyleDef {
    let base = StyleDef {
        size: 24,
        bold: false,
        italic: false,
        space_before: 0,
        space_after: 160,
        indent: None,
    };
    match style {
        ParagraphStyle::Title => StyleDef {
            size: 36,
            bold: true,
            space_after: 240,
            ..base
        },
        ParagraphStyle::Heading1 => StyleDef {
            size: 30,
            bold: true,
            space_before: 240,
            space_after: 120,
            ..base
        },
        ParagraphStyle::Heading2 => StyleDef {
            size: 26,
            bold: true,
            space_before: 200,
            space_after: 100,
            ..base
        },
        ParagraphStyle::Heading3 => StyleDef {
            size: 24,
            bold: true,
            space_before: 160,
            space_after: 80,
            ..base
        },
        ParagraphStyle::Body => base,
        ParagraphStyle::ListItem => StyleDef {
            space_after: 80,
            indent: Some((LIST_INDENT, LIST_HANGING)),
            ..base
        },
        ParagraphStyle::Quote => StyleDef {
            italic: true,
            indent: Some((QUOTE_INDENT, 0)),
            ..base
        },
    }
}

fn write_style(out: &mut XmlOut, style: ParagraphStyle) -> Result<(), RenderError> {
    let def = definition(style);
    let mut attrs = vec![("w:type", "paragraph"), ("w:styleId", style.style_id())];
    if style == ParagraphStyle::Body {
        attrs.push(("w:default", "1"));
    }

    out.open("w:style", &attrs)?;
    out.empty("w:name", &[("w:val", style.display_name())])?;
    if style != ParagraphStyle::Body {
        out.empty("w:basedOn", &[("w:val", ParagraphStyle::Body.style_id())])?;
        out.empty("w:next", &[("w:val", ParagraphStyle::Body.style_id())])?;
    }
    out.empty("w:qFormat", &[])?;

    let before = def.space_before.to_string();
    let after = def.space_after.to_string();
    out.open("w:pPr", &[])?;
    if matches!(
        style,
        ParagraphStyle::Title | ParagraphStyle::Heading1 | ParagraphStyle::Heading2 | ParagraphStyle::Heading3
    ) {
        out.empty("w:keepNext", &[])?;
    }
    out.empty("w:spacing", &[("w:before", before.as_str()), ("w:after", after.as_str())])?;
    if let Some((left, hanging)) = def.indent {
        let left = left.to_string();
        let hanging = hanging.to_string();
        out.empty("w:ind", &[("w:left", left.as_str()), ("w:hanging", hanging.as_str())])?;
    }
    out.close("w:pPr")?;

    let size = def.size.to_string();
    out.open("w:rPr", &[])?;
    if def.bold {
        out.empty("w:b", &[])?;
    }
    if def.italic {
        out.empty("w:i", &[])?;
    }
    out.empty("w:sz", &[("w:val", size.as_str())])?;
    out.empty("w:szCs", &[("w:val", size.as_str())])?;
    out.close("w:rPr")?;

    out.close("w:style")
}

pub fn styles_xml() -> Result<Vec<u8>, RenderError> {
    let mut out = XmlOut::new()?;
    out.open("w:styles", &[("xmlns:w", NS_W)])?;

    out.open("w:docDefaults", &[])?;
    out.open("w:rPrDefault", &[])?;
    out.open("w:rPr", &[])?;
    out.empty(
        "w:rFonts",
        &[
            ("w:ascii", "Times New Roman"),
            ("w:hAnsi", "Times New Roman"),
            ("w:cs", "Times New Roman"),
        ],
    )?;
    out.empty("w:sz", &[("w:val", "24")])?;
    out.close("w:rPr")?;
    out.close("w:rPrDefault")?;
    out.close("w:docDefaults")?;

    for style in ParagraphStyle::ALL {
        write_style(&mut out, style)?;
    }

    out.close("w:styles")?;
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_mapping() {
        let ids: Vec<&str> = (1..=6)
            .map(|level| ParagraphStyle::for_block(&BlockKind::Heading(level)).style_id())
            .collect();
        assert_eq!(
            ids,
            vec!["Title", "Heading1", "Heading2", "Heading3", "Heading3", "Heading3"]
        );
    }

    #[test]
    fn test_non_heading_mapping() {
        assert_eq!(ParagraphStyle::for_block(&BlockKind::Paragraph), ParagraphStyle::Body);
        assert_eq!(ParagraphStyle::for_block(&BlockKind::Quote), ParagraphStyle::Quote);
        assert_eq!(
            ParagraphStyle::for_block(&BlockKind::ListItem {
                depth: 2,
                marker: None
            }),
            ParagraphStyle::ListItem
        );
    }

    #[test]
    fn test_styles_xml_defines_every_style() {
        let xml = String::from_utf8(styles_xml().unwrap()).unwrap();
        for style in ParagraphStyle::ALL {
            assert!(
                xml.contains(&format!(r#"w:styleId="{}""#, style.style_id())),
                "missing {}",
                style.style_id()
            );
        }
        assert!(xml.contains(r#"w:styleId="Normal" w:default="1""#));
    }
}
