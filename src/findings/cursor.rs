//! `file://` deep links for findings.

use std::path::{Path, PathBuf};

use crate::domain::Finding;

/// Give every finding without a `cursor_uri` a `file://` link into `repo_root`.
///
/// Findings that already carry a URI are left untouched.
pub fn assign_cursor_uris(findings: &[Finding], repo_root: &Path) -> Vec<Finding> {
    findings
        .iter()
        .map(|f| {
            let mut f = f.clone();
            if f.cursor_uri.is_none() && !f.file.is_empty() {
                f.cursor_uri = Some(cursor_uri(repo_root, &f));
            }
            f
        })
        .collect()
}

fn cursor_uri(repo_root: &Path, finding: &Finding) -> String {
    let joined = repo_root.join(&finding.file);
    let absolute: PathBuf = std::path::absolute(&joined).unwrap_or(joined);

    let mut path = absolute.to_string_lossy().replace('\\', "/");
    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    let mut uri = format!("file://{}", path);
    match finding.range {
        Some(range) if range.is_valid() => {
            uri.push_str(&format!("#L{}-{}", range.start, range.end));
        }
        _ if finding.line > 0 => uri.push_str(&format!("#L{}", finding.line)),
        _ => {}
    }
    uri
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineRange;

    fn finding(line: u32, range: Option<LineRange>) -> Finding {
        Finding {
            file: "src/main.rs".to_string(),
            line,
            range,
            confidence: 1.0,
            message: "m".to_string(),
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn builds_line_and_range_fragments() {
        let root = Path::new("/repo");
        let out = assign_cursor_uris(
            &[
                finding(7, None),
                finding(7, Some(LineRange::new(7, 9))),
                finding(0, None),
            ],
            root,
        );

        assert_eq!(out[0].cursor_uri.as_deref(), Some("file:///repo/src/main.rs#L7"));
        assert_eq!(out[1].cursor_uri.as_deref(), Some("file:///repo/src/main.rs#L7-9"));
        assert_eq!(out[2].cursor_uri.as_deref(), Some("file:///repo/src/main.rs"));
    }

    #[test]
    fn explicit_uri_is_preserved() {
        let mut f = finding(3, None);
        f.cursor_uri = Some("vscode://file/x".to_string());
        let out = assign_cursor_uris(&[f.clone()], Path::new("/repo"));
        assert_eq!(out, vec![f]);
    }
}
