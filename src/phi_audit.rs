// Static check over every source file: tracing calls may carry ids, counts,
// scores and levels, never record content.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    /// Field names and interpolations that would put record content into logs.
    const PHI_PATTERNS: &[&str] = &[
        // Record fields
        "medication_name",
        "condition_name",
        "allergen_name",
        "allergy_name",
        "dose_value",
        "dose_unit",
        "indication =",
        ".indication",
        "birth_date",
        "weight_kg",
        "value_text",
        // Derived content
        "normalized",
        "subjects",
        "rationale",
        "allergen",
        "trigger.label",
        // Interpolations of entry names
        "entry.name",
        "med.entry.name",
        "record.name",
        "o.name",
        "c.name",
        "f.medication",
    ];

    /// Files that mention the patterns outside tracing calls.
    const ALLOWLIST: &[&str] = &["phi_audit.rs"];

    #[test]
    fn no_phi_in_tracing_calls() {
        let src_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("src");
        assert!(src_dir.exists(), "Source directory not found: {}", src_dir.display());

        let mut violations = Vec::new();
        scan_directory(&src_dir, &mut violations);

        if !violations.is_empty() {
            let report = violations
                .iter()
                .map(|(file, line_num, line, pattern)| {
                    format!("  {}:{}: found '{}' in: {}", file, line_num, pattern, line.trim())
                })
                .collect::<Vec<_>>()
                .join("\n");
            panic!(
                "PHI audit failed, {} violation(s) in tracing calls:\n{}\n\n\
                 Log opaque ids and counts instead.",
                violations.len(),
                report
            );
        }
    }

    #[test]
    fn scanner_detects_known_violation() {
        let line = r#"tracing::debug!(medication = %med.entry.name, "skipped");"#;
        assert!(PHI_PATTERNS.iter().any(|p| line.contains(p)));
    }

    #[test]
    fn scanner_passes_clean_tracing() {
        let line = r#"tracing::debug!(entry_id = %entry.id, "No resolvable dose, skipped");"#;
        assert!(!PHI_PATTERNS.iter().any(|p| line.contains(p)));
    }

    #[test]
    fn contraindication_wording_is_not_a_field() {
        let line = r#"tracing::debug!(findings = 2, "Contraindication check complete");"#;
        assert!(!PHI_PATTERNS.iter().any(|p| line.contains(p)));
        let leaked = r#"tracing::debug!(indication = %med.indication, "checked");"#;
        assert!(PHI_PATTERNS.iter().any(|p| leaked.contains(p)));
    }

    #[test]
    fn collects_multiline_calls() {
        let source = concat!(
            "let x = 1;\n",
            "tracing::info!(\n",
            "    score = 1.0,\n",
            "    rationale = %f.rationale,\n",
            "    \"done\"\n",
            ");\n",
        );
        let calls = tracing_calls(source);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, 2);
        assert!(calls[0].1.contains("rationale"));
    }

    fn scan_directory(dir: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                scan_directory(&path, violations);
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                scan_file(&path, violations);
            }
        }
    }

    fn scan_file(path: &Path, violations: &mut Vec<(String, usize, String, String)>) {
        let filename = path.file_name().unwrap_or_default().to_string_lossy();
        if ALLOWLIST.iter().any(|a| filename.contains(a)) {
            return;
        }
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        let relative_path = path
            .strip_prefix(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"))
            .unwrap_or(path)
            .display()
            .to_string();

        for (line_num, call) in tracing_calls(&content) {
            for pattern in PHI_PATTERNS {
                if call.contains(pattern) {
                    violations.push((
                        relative_path.clone(),
                        line_num,
                        call.clone(),
                        pattern.to_string(),
                    ));
                }
            }
        }
    }

    /// Every tracing macro call with its 1-indexed start line, joined onto one line.
    fn tracing_calls(content: &str) -> Vec<(usize, String)> {
        let lines: Vec<&str> = content.lines().collect();
        let mut calls = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let trimmed = lines[i].trim();
            let is_call = ["info!", "warn!", "error!", "debug!", "trace!"]
                .iter()
                .any(|m| trimmed.starts_with(&format!("tracing::{m}")));
            if !is_call {
                i += 1;
                continue;
            }

            let mut call = String::from(trimmed);
            let mut depth = paren_balance(trimmed);
            let mut j = i + 1;
            while depth > 0 && j < lines.len() {
                let next = lines[j].trim();
                call.push(' ');
                call.push_str(next);
                depth += paren_balance(next);
                j += 1;
            }
            calls.push((i + 1, call));
            i = j;
        }
        calls
    }

    fn paren_balance(line: &str) -> i32 {
        line.chars().fold(0, |acc, ch| match ch {
            '(' => acc + 1,
            ')' => acc - 1,
            _ => acc,
        })
    }
}
