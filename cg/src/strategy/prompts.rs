//! Shared prompt assembly for the strategies
//!
//! Artifact prompts follow the phrasing teachers expect in Indonesian
//! curriculum documents: CP (Capaian Pembelajaran) states competencies,
//! ATP (Alur Tujuan Pembelajaran) sequences learning goals.

use std::fmt::Write;

use crate::backends::RetrievedDocument;
use crate::domain::{ContentRequest, ARTIFACT_PRIMARY};

/// Core instruction for one artifact
pub(super) fn artifact_instruction(artifact: &str, request: &ContentRequest) -> String {
    let mut out = String::new();
    if artifact == ARTIFACT_PRIMARY {
        let _ = write!(
            out,
            "Buatlah Capaian Pembelajaran (CP) untuk mata pelajaran {} kelas {} fase {} dengan topik {}.",
            request.subject, request.grade, request.phase, request.topic
        );
        out.push_str(" CP harus menyatakan kompetensi yang mampu dicapai peserta didik dalam pembelajaran.");
    } else {
        let _ = write!(
            out,
            "Buatlah Alur Tujuan Pembelajaran (ATP) untuk mata pelajaran {} kelas {} fase {} dengan topik {}.",
            request.subject, request.grade, request.phase, request.topic
        );
        out.push_str(" ATP harus berisi urutan tujuan pembelajaran beserta indikator evaluasi untuk setiap tahap.");
    }
    if !request.sub_topic.trim().is_empty() {
        let _ = write!(out, " Sub-topik: {}.", request.sub_topic);
    }
    let _ = write!(out, " Alokasi waktu: {} menit.", request.time_allocation);
    out
}

/// Reference block from retrieved documents
pub(super) fn reference_block(docs: &[RetrievedDocument]) -> String {
    if docs.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\nDokumen referensi:\n");
    for (i, doc) in docs.iter().enumerate() {
        let _ = writeln!(out, "{}. [{}] {}", i + 1, doc.source, doc.content);
    }
    out
}

/// Additional context block (primary artifact or refinement feedback)
pub(super) fn context_block(extra_context: Option<&str>) -> String {
    match extra_context {
        Some(extra) if !extra.trim().is_empty() => format!("\n\nKonteks tambahan:\n{}", extra),
        _ => String::new(),
    }
}
