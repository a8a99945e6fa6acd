use crate::tree::TreeNode;
use foldcmp_common::{FoldCmpError, RelativePath};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Turns a flat list of relative paths into something a person can browse
pub trait ReportSink {
    /// `base_roots` are the roots `entries` are relative to, offered to the
    /// reader to resolve an entry to a full path.
    fn emit(
        &mut self,
        entries: &[RelativePath],
        base_roots: &[PathBuf],
        title: &str,
    ) -> Result<(), FoldCmpError>;
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{TITLE}}</title>
<style>
* { margin: 0; padding: 0; box-sizing: border-box; font-family: -apple-system, "Segoe UI", Roboto, Arial, sans-serif; }
html, body { height: 100%; overflow: hidden; background: #ededed; color: #000; }
.container { height: 100%; max-width: 860px; margin: 0 auto; background: #fff; display: flex; flex-direction: column; }
.header { padding: 20px; border-bottom: 1px solid #e6e6e6; display: flex; justify-content: space-between; align-items: center; }
.title { font-size: 18px; font-weight: bold; color: #333; }
.search { width: 300px; background: #f5f5f5; border: none; border-radius: 4px; padding: 8px 12px; font-size: 14px; outline: none; }
.tree { flex: 1; overflow-y: auto; padding: 10px 0; }
.tree-item { padding: 10px 20px; display: flex; align-items: center; cursor: pointer; }
.tree-item:hover { background: #f5f5f5; }
.tree-item .icon { margin-right: 10px; color: #07c160; }
.tree-item.file .icon { color: #888; }
.tree-item .name { font-size: 14px; color: #333; }
.tree-content { margin-left: 20px; border-left: 1px solid #f0f0f0; }
.hidden { display: none; }
.arrow { display: inline-block; width: 8px; height: 8px; border-right: 2px solid #888; border-bottom: 2px solid #888; transform: rotate(-45deg); margin-right: 10px; transition: transform 0.2s; }
.arrow.expanded { transform: rotate(45deg); }
.no-results { padding: 20px; text-align: center; color: #888; font-size: 14px; display: none; }
.status-bar { padding: 10px 20px; background: #f9f9f9; border-top: 1px solid #e6e6e6; color: #666; font-size: 12px; display: flex; justify-content: space-between; align-items: center; }
.roots { padding: 4px 8px; border: 1px solid #ddd; border-radius: 4px; font-size: 12px; max-width: 360px; }
</style>
</head>
<body>
<div class="container">
  <div class="header">
    <div class="title">{{TITLE}}</div>
    <input type="text" class="search" id="search" placeholder="Filter">
  </div>
  <div class="tree" id="tree">
{{TREE}}
  </div>
  <div class="no-results" id="noResults">No matching entries</div>
  <div class="status-bar">
    <div>{{COUNT}} entries | shown: <span id="visibleCount">0</span> | generated {{GENERATED}}</div>
    <select class="roots" id="roots">
{{ROOT_OPTIONS}}
    </select>
  </div>
</div>
<script>
document.addEventListener('DOMContentLoaded', function () {
  document.querySelectorAll('.tree-content .tree-content').forEach(function (c) { c.classList.add('hidden'); });

  document.querySelectorAll('.tree-item.folder').forEach(function (item) {
    item.addEventListener('click', function (e) {
      e.stopPropagation();
      var content = this.nextElementSibling;
      if (content && content.classList.contains('tree-content')) {
        content.classList.toggle('hidden');
        var arrow = this.querySelector('.arrow');
        if (arrow) { arrow.classList.toggle('expanded'); }
      }
    });
  });

  document.querySelectorAll('.tree-item.file').forEach(function (item) {
    item.addEventListener('click', function (e) {
      e.stopPropagation();
      var base = document.getElementById('roots').value;
      var rel = this.getAttribute('data-path');
      if (base && rel) {
        window.open('file:///' + (base + '/' + rel).replace(/\\/g, '/').replace(/^\/+/, ''), '_blank');
      }
    });
  });

  function updateCount() {
    var visible = 0;
    document.querySelectorAll('.tree-item').forEach(function (item) {
      if (item.style.display !== 'none') { visible++; }
    });
    document.getElementById('visibleCount').textContent = visible;
  }
  updateCount();

  document.getElementById('search').addEventListener('input', function () {
    var needle = this.value.toLowerCase();
    var any = false;
    document.querySelectorAll('.tree-item').forEach(function (item) {
      var show = item.textContent.toLowerCase().indexOf(needle) !== -1;
      item.style.display = show ? '' : 'none';
      if (show) {
        any = true;
        var parent = item.parentElement;
        while (parent && parent.classList.contains('tree-content')) {
          parent.classList.remove('hidden');
          parent = parent.parentElement;
        }
      }
    });
    document.getElementById('noResults').style.display = any ? 'none' : 'block';
    updateCount();
  });
});
</script>
</body>
</html>
"#;

/// Self-contained HTML page per report, written to a directory or a kept temp file
#[derive(Debug, Default)]
pub struct HtmlReport {
    output_dir: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl HtmlReport {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self {
            output_dir,
            written: Vec::new(),
        }
    }

    /// Files produced so far, in emit order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_page(&self, title: &str, page: &str) -> Result<PathBuf, FoldCmpError> {
        match self.output_dir {
            Some(ref dir) => {
                fs::create_dir_all(dir)?;
                let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
                let path = dir.join(format!(
                    "foldcmp-{}-{}-{}.html",
                    stamp,
                    self.written.len() + 1,
                    file_slug(title)
                ));
                fs::write(&path, page)?;
                Ok(path)
            }
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("foldcmp-")
                    .suffix(".html")
                    .tempfile()?;
                file.write_all(page.as_bytes())?;
                let (_, path) = file
                    .keep()
                    .map_err(|e| FoldCmpError::Report(format!("Failed to keep report file: {}", e)))?;
                Ok(path)
            }
        }
    }
}

impl ReportSink for HtmlReport {
    fn emit(
        &mut self,
        entries: &[RelativePath],
        base_roots: &[PathBuf],
        title: &str,
    ) -> Result<(), FoldCmpError> {
        if entries.is_empty() {
            debug!("Nothing to report for '{}'", title);
            return Ok(());
        }

        let tree = TreeNode::build(entries);
        let page = render_html(&tree, entries.len(), base_roots, title);
        let path = self.write_page(title, &page)?;
        info!("Wrote report '{}' to {}", title, path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Render the full HTML page for a built tree
pub fn render_html(tree: &TreeNode, entry_count: usize, base_roots: &[PathBuf], title: &str) -> String {
    let mut body = String::new();
    for child in tree.children() {
        render_node(child, &mut body);
    }

    let options: String = base_roots
        .iter()
        .map(|root| {
            let value = escape_html(&root.to_string_lossy().replace('\\', "/"));
            format!("      <option value=\"{0}\">{0}</option>\n", value)
        })
        .collect();

    let title = escape_html(title);
    let count = entry_count.to_string();
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    fill_template(
        HTML_TEMPLATE,
        &[
            ("TITLE", &title),
            ("COUNT", &count),
            ("GENERATED", &generated),
            ("ROOT_OPTIONS", &options),
            ("TREE", &body),
        ],
    )
}

/// Substitute `{{NAME}}` markers in one left-to-right pass.
///
/// Inserted values are never scanned again, so a value that itself contains
/// a marker is emitted as-is. Unknown markers are kept verbatim.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn render_node(node: &TreeNode, out: &mut String) {
    let view = node.compress();
    let name = escape_html(&view.display_name);

    if view.is_leaf() {
        let data_path = view
            .original_path()
            .map(|p| escape_html(p.as_str()))
            .unwrap_or_default();
        out.push_str(&format!(
            "<div class=\"tree-item file\" data-path=\"{}\"><span class=\"icon\">&#128196;</span><span class=\"name\">{}</span></div>\n",
            data_path, name
        ));
        return;
    }

    let data_path = view
        .original_path()
        .map(|p| escape_html(p.as_str()))
        .unwrap_or_default();
    out.push_str(&format!(
        "<div class=\"tree-item folder\" data-path=\"{}\"><span class=\"arrow\"></span><span class=\"icon\">&#128193;</span><span class=\"name\">{}</span></div>\n<div class=\"tree-content\">\n",
        data_path, name
    ));
    for child in view.children() {
        render_node(child, out);
    }
    out.push_str("</div>\n");
}

/// Escape text for use in HTML content and double-quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn file_slug(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug.chars().take(48).collect()
    }
}

/// Indented plain-text rendering of the compressed tree
pub struct TextTreeReport<W: Write> {
    writer: W,
}

impl<W: Write> TextTreeReport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for TextTreeReport<W> {
    fn emit(
        &mut self,
        entries: &[RelativePath],
        base_roots: &[PathBuf],
        title: &str,
    ) -> Result<(), FoldCmpError> {
        if entries.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "{} ({})", title, entries.len())?;
        let roots: Vec<String> = base_roots.iter().map(|r| r.display().to_string()).collect();
        if !roots.is_empty() {
            writeln!(self.writer, "  under: {}", roots.join(", "))?;
        }

        for row in TreeNode::build(entries).rows() {
            let indent = "  ".repeat(row.depth + 1);
            let suffix = if row.is_folder { "/" } else { "" };
            writeln!(self.writer, "{}{}{}", indent, row.display_name, suffix)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}
