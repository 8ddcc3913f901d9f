use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::idea::Idea;
use crate::quadrant::{Board, Quadrant};
use crate::task::{Priority, Task};
use crate::views::{CompletionStats, SearchResults};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, title, tasks, today))]
    pub fn print_task_section(
        &mut self,
        title: &str,
        tasks: &[Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{} ({})", title, tasks.len())?;
        if tasks.is_empty() {
            return Ok(());
        }
        self.write_task_table(&mut out, tasks, today)
    }

    #[tracing::instrument(skip(self, board, today))]
    pub fn print_board(&mut self, board: &Board, today: NaiveDate) -> anyhow::Result<()> {
        let quadrants = [
            (Quadrant::Q1, &board.q1),
            (Quadrant::Q2, &board.q2),
            (Quadrant::Q3, &board.q3),
            (Quadrant::Q4, &board.q4),
        ];

        let mut out = io::stdout().lock();
        for (idx, (quadrant, tasks)) in quadrants.iter().enumerate() {
            if idx > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{} ({})", quadrant.label(), tasks.len())?;
            if !tasks.is_empty() {
                self.write_task_table(&mut out, tasks, today)?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, ideas))]
    pub fn print_idea_list(&mut self, ideas: &[Idea]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Ideas ({})", ideas.len())?;

        for idea in ideas {
            let id = self.paint(&idea.id.to_string(), "33");
            writeln!(out, "{} {}", id, idea.title)?;
            if !idea.description.is_empty() {
                writeln!(out, "    {}", idea.description)?;
            }
            for sub in &idea.sub_tasks {
                let mark = if sub.completed { "[x]" } else { "[ ]" };
                let priority = match sub.priority {
                    Priority::None => String::new(),
                    other => format!(" ({other})"),
                };
                writeln!(out, "    {} {} {}{}", mark, sub.id, sub.text, priority)?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, results, today))]
    pub fn print_search_results(
        &mut self,
        results: &SearchResults,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "Tasks ({})", results.tasks.len())?;
        if !results.tasks.is_empty() {
            self.write_task_table(&mut out, &results.tasks, today)?;
        }

        writeln!(out)?;
        writeln!(out, "Tags ({})", results.tags.len())?;
        for hit in &results.tags {
            writeln!(out, "  {} ({} task(s))", hit.name, hit.count)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, stats))]
    pub fn print_stats(&mut self, stats: &CompletionStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "completed today      {}", stats.today)?;
        writeln!(out, "completed this week  {}", stats.week)?;
        writeln!(out, "completed this month {}", stats.month)?;
        writeln!(out, "completed total      {}", stats.total)?;
        Ok(())
    }

    fn write_task_table<W: Write>(
        &self,
        writer: &mut W,
        tasks: &[Task],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Due".to_string(),
            "Pri".to_string(),
            "Description".to_string(),
            "Tags".to_string(),
        ];

        let mut rows = Vec::with_capacity(tasks.len());
        for task in tasks {
            let id = self.paint(&task.id.to_string(), "33");

            let due = task
                .due_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let due = if task.is_overdue(today) {
                self.paint(&due, "31")
            } else {
                due
            };

            let priority = match task.priority {
                Priority::None => String::new(),
                Priority::High => self.paint("high", "31"),
                Priority::Medium => self.paint("medium", "33"),
                Priority::Low => self.paint("low", "34"),
            };

            let tags = task
                .tags
                .iter()
                .map(|tag| format!("+{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![id, due, priority, task.text.clone(), tags]);
        }

        write_table(writer, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
