//! Minimal PowerPoint (OOXML) writer.
//!
//! Produces one master, one blank layout and one theme, followed by a title
//! slide and a bulleted slide per [`Slide`].

use std::io::{Cursor, Write};

use edubridge_common::{Error, Result};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default)]
    pub content: Vec<String>,
}

pub fn render_pptx(title: &str, slides: &[Slide]) -> Result<Vec<u8>> {
    let slide_count = slides.len() + 1;
    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types(slide_count)),
        ("_rels/.rels".into(), root_rels()),
        ("ppt/presentation.xml".into(), presentation(slide_count)),
        (
            "ppt/_rels/presentation.xml.rels".into(),
            presentation_rels(slide_count),
        ),
        ("ppt/slideMasters/slideMaster1.xml".into(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".into(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/theme/theme1.xml".into(), theme()),
    ];

    let title_slide = slide_xml(
        title_shape(2, "ctrTitle", title, 2130425),
        text_shape(3, "subTitle", &["Generated by EduBridge".to_string()], false),
    );
    let mut bodies = vec![title_slide];
    bodies.extend(slides.iter().map(|slide| {
        slide_xml(
            title_shape(2, "title", &slide.title, 274638),
            text_shape(3, "body", &slide.content, true),
        )
    }));

    for (index, body) in bodies.into_iter().enumerate() {
        let n = index + 1;
        parts.push((format!("ppt/slides/slide{n}.xml"), body));
        parts.push((
            format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in parts {
        zip.start_file(name.as_str(), options)
            .map_err(|e| Error::Render(format!("failed to start {name}: {e}")))?;
        zip.write_all(body.as_bytes())?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| Error::Render(format!("failed to finish presentation: {e}")))?;
    Ok(cursor.into_inner())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // XML 1.0 forbids most control characters.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

fn content_types(slide_count: usize) -> String {
    let slides: String = (1..=slide_count)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>{slides}</Types>"#
    )
}

fn root_rels() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_TYPE}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
    )
}

fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{id}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#)
        })
        .collect();
    format!(r#"{XML_DECL}<Relationships xmlns="{REL_NS}">{body}</Relationships>"#)
}

// rId1 is the master, rId2..=rId{n+1} the slides, and the theme comes last.
fn presentation_rels(slide_count: usize) -> String {
    let slide_targets: Vec<(String, String)> = (1..=slide_count)
        .map(|n| (format!("rId{}", n + 1), format!("slides/slide{n}.xml")))
        .collect();
    let theme_id = format!("rId{}", slide_count + 2);

    let mut entries: Vec<(&str, &str, &str)> =
        vec![("rId1", "slideMaster", "slideMasters/slideMaster1.xml")];
    for (id, target) in &slide_targets {
        entries.push((id.as_str(), "slide", target.as_str()));
    }
    entries.push((theme_id.as_str(), "theme", "theme/theme1.xml"));
    relationships(&entries)
}

fn presentation(slide_count: usize) -> String {
    let ids: String = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000" type="screen4x3"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let accents = ["496D89", "C0504D", "9BBB59", "8064A2", "4BACC6", "F79646"];
    let accent_xml: String = accents
        .iter()
        .enumerate()
        .map(|(i, rgb)| format!(r#"<a:accent{n}><a:srgbClr val="{rgb}"/></a:accent{n}>"#, n = i + 1))
        .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="9525">{fill}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    let font = r#"<a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/>"#;

    format!(
        r#"{XML_DECL}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="EduBridge"><a:themeElements><a:clrScheme name="EduBridge"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2>{accent_xml}<a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="EduBridge"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme><a:fmtScheme name="EduBridge"><a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

fn slide_xml(title: String, body: String) -> String {
    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}{title}{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn title_shape(id: u32, placeholder: &str, text: &str, y: u64) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Title {id}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="{placeholder}"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="{y}"/><a:ext cx="8229600" cy="1143000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="3600" b="1"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
        escape(text)
    )
}

fn text_shape(id: u32, placeholder: &str, lines: &[String], bulleted: bool) -> String {
    let paragraphs: String = if lines.is_empty() {
        "<a:p/>".to_string()
    } else {
        lines
            .iter()
            .map(|line| {
                let bullet = if bulleted {
                    r#"<a:pPr marL="342900" indent="-342900"><a:buChar char="&#8226;"/></a:pPr>"#
                } else {
                    ""
                };
                format!(
                    r#"<a:p>{bullet}<a:r><a:rPr lang="en-US" sz="2000"/><a:t>{}</a:t></a:r></a:p>"#,
                    escape(line)
                )
            })
            .collect()
    };
    let idx = if placeholder == "body" { r#" idx="1""# } else { "" };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="{placeholder}"{idx}/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="1600200"/><a:ext cx="8229600" cy="4525963"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
    )
}
