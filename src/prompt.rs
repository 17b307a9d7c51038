//! Terminal decision prompt for ambiguous and unmatched lines.

use crate::resolve::{Decision, DecisionError, DecisionProvider, DecisionRequest};
use anyhow::Result;
use rustyline::DefaultEditor;

pub struct PromptDecisionProvider {
    editor: DefaultEditor,
}

impl PromptDecisionProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }

    fn print_menu(request: &DecisionRequest) {
        println!("\n\"{} - {}\"", request.artist, request.title);
        if request.candidates.is_empty() {
            println!("  no close matches in the library");
        } else {
            for (index, candidate) in request.candidates.iter().enumerate() {
                let live = if candidate.record.is_live { " [live]" } else { "" };
                println!(
                    "  {}) {} - {}{} ({:.0}%)  {}",
                    index + 1,
                    candidate.record.artist,
                    candidate.record.title,
                    live,
                    candidate.adjusted_score,
                    candidate.record.path.display()
                );
            }
        }
        println!("  s) skip this track");
        if request.artist_pool_size > 0 {
            println!("  r) random track by this artist");
        }
    }
}

impl DecisionProvider for PromptDecisionProvider {
    fn decide(&mut self, request: &DecisionRequest) -> Result<Decision, DecisionError> {
        Self::print_menu(request);
        loop {
            let line = match self.editor.readline("> ") {
                Ok(line) => line,
                Err(rustyline::error::ReadlineError::Interrupted)
                | Err(rustyline::error::ReadlineError::Eof) => {
                    return Err(DecisionError::Cancelled)
                }
                Err(e) => return Err(DecisionError::ChannelClosed(e.to_string())),
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "s" | "skip" => return Ok(Decision::Skip),
                "r" | "random" if request.artist_pool_size > 0 => {
                    return Ok(Decision::RandomByArtist)
                }
                input => match input.parse::<usize>() {
                    Ok(n) if (1..=request.candidates.len()).contains(&n) => {
                        return Ok(Decision::Candidate(n - 1))
                    }
                    _ => println!("Pick a listed number, 's' to skip"),
                },
            }
        }
    }
}
