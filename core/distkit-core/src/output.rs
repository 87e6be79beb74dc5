//! Report writers (pretty JSON and NDJSON)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::pipeline::RunReport;

/// Write any report as a prettified JSON document.
pub fn write_json_pretty<T: Serialize + ?Sized>(report: &T, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write one JSON object per stage, followed by one line per artifact.
pub fn write_ndjson(report: &RunReport, mut w: impl Write) -> Result<()> {
    for record in &report.stages {
        let line = serde_json::to_string(record)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    for artifact in &report.artifacts {
        let line = serde_json::to_string(&serde_json::json!({ "artifact": artifact }))?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Stage, StageOutcome, StageRecord};
    use std::path::PathBuf;

    fn sample_report() -> RunReport {
        RunReport {
            stages: vec![
                StageRecord {
                    stage: Stage::TerminateProcesses,
                    outcome: StageOutcome::Passed,
                },
                StageRecord {
                    stage: Stage::ClearCache,
                    outcome: StageOutcome::Degraded {
                        reason: "`npm cache clean --force` failed".to_string(),
                    },
                },
            ],
            artifacts: vec![PathBuf::from("dist/AntNote Setup.exe")],
            ..RunReport::default()
        }
    }

    #[test]
    fn ndjson_writes_one_line_per_stage_and_artifact() {
        let mut buf = Vec::new();
        write_ndjson(&sample_report(), &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("parse");
        assert_eq!(first["stage"], "terminate-processes");
        assert_eq!(first["outcome"]["status"], "passed");

        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(second["outcome"]["status"], "degraded");

        let last: serde_json::Value = serde_json::from_str(lines[2]).expect("parse");
        assert_eq!(last["artifact"], "dist/AntNote Setup.exe");
    }

    #[test]
    fn pretty_json_is_a_single_document() {
        let mut buf = Vec::new();
        write_json_pretty(&sample_report(), &mut buf).expect("write json");

        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("json");
        assert_eq!(parsed["stages"].as_array().map(Vec::len), Some(2));
        assert!(parsed.get("license_prune").is_none());
    }
}
