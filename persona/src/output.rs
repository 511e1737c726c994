//! Plain-text rendering of memories, responses and run state.

use persona_core::{ExtractedMemories, GenerationReport, PersonalityKind, RunState};

pub fn print_memories(memories: &ExtractedMemories) {
    println!("[MEMORIES]");
    print_category("Preferences", &memories.preferences);
    print_category("Facts", &memories.facts);
    print_category("Emotional patterns", &memories.emotional_patterns);
    println!();
}

fn print_category(title: &str, items: &[String]) {
    println!("  {title}:");
    if items.is_empty() {
        println!("    (none)");
    }
    for item in items {
        println!("    - {item}");
    }
}

pub fn print_response(kind: PersonalityKind, text: &str) {
    println!("[{}]", kind.label().to_uppercase());
    println!("{}", text.trim());
    println!();
}

pub fn print_report(report: &GenerationReport) {
    if report.cancelled {
        println!("[CANCELLED] Run stopped early; responses cleared.");
        return;
    }
    for failure in &report.failures {
        println!("[FAILED] {}: {}", failure.kind.label(), failure.error);
    }
    println!(
        "[DONE] {}/{} personalities responded",
        report.responses.populated(),
        PersonalityKind::ALL.len()
    );
}

pub fn print_status(state: &RunState, buffered_lines: usize) {
    println!("[STATUS]");
    println!("  Buffered transcript lines: {buffered_lines}");
    println!("  Stored transcript: {} messages", state.transcript.len());
    match &state.memories {
        Some(m) => println!("  Memories: {} items", m.total()),
        None => println!("  Memories: none"),
    }
    for (kind, response) in state.responses.iter() {
        let status = match (response, state.generation_errors.get(&kind)) {
            (Some(_), _) => "ready".to_string(),
            (None, Some(error)) => format!("failed ({error})"),
            (None, None) => "empty".to_string(),
        };
        println!("  {}: {status}", kind.label());
    }
    if let Some(run) = state.busy {
        println!("  Running: {run}");
    }
}
