//! Plain-text renderers for the terminal front end.
use std::fmt::Write as _;
use std::io::Write as _;

use crate::dashboard::ActivityView;
use crate::notify::{Chime, Notification, NotificationPresenter};
use crate::pagination::{ListFrame, ListView, PageControl};
use crate::review::{DetailFrame, DetailView};

const NA: &str = "N/A";

fn or_na(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or(NA)
}

pub fn format_controls(controls: &[PageControl]) -> String {
    controls
        .iter()
        .map(|c| {
            if c.active {
                format!("*{}*", c.label)
            } else if c.disabled {
                format!("({})", c.label)
            } else {
                format!("[{}]", c.label)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_list(title: &str, frame: &ListFrame) -> String {
    let mut out = String::new();
    let total = frame
        .total
        .map(|t| format!(", {} total", t))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "== {} (page {} of {}{}) ==",
        title,
        frame.page,
        frame.total_pages.max(1),
        total
    );
    if let Some(empty) = frame.empty_text() {
        let _ = writeln!(out, "   {}", empty);
    }
    for (i, row) in frame.rows.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {:>2}. {:<24} {:<18} {:<28} {}",
            row.severity.marker(),
            i + 1,
            row.patient_name,
            row.facility_name,
            row.alert_type,
            row.alert_date_time
        );
    }
    if !frame.controls.is_empty() {
        let _ = writeln!(out, "   {}", format_controls(&frame.controls));
    }
    out
}

pub fn format_detail(frame: &DetailFrame) -> String {
    let mut out = String::new();
    match &frame.patient {
        Some(p) => {
            let _ = writeln!(out, "== {} (RJ{}) ==", p.full_name(), p.patient_id);
            let age = p.patient_age.map(|a| a.to_string());
            let _ = writeln!(out, "DOB/Age:    {} ({})", or_na(&p.patient_dob), or_na(&age));
            let _ = writeln!(out, "Gender:     {}", or_na(&p.patient_gender));
            let _ = writeln!(out, "Facility:   {}", or_na(&p.facility_name));
            let _ = writeln!(out, "Room:       {}", or_na(&p.patient_room));
            let _ = writeln!(out, "Admitted:   {}", or_na(&p.patient_admission_date));
            let _ = writeln!(out, "Physician:  {}", or_na(&p.physician()));
            let _ = writeln!(out, "Insurance:  {}", or_na(&p.patient_insurance));
        }
        None => {
            let _ = writeln!(out, "== {} ==", frame.session.patient_name);
            let _ = writeln!(out, "Patient details unavailable");
        }
    }

    let _ = writeln!(out, "\n-- Alert Details --");
    match &frame.alert {
        Some(a) => {
            let _ = writeln!(out, "{}", a.alert_type);
            if let Some(detail) = &a.alert_detail {
                let _ = writeln!(out, "{}", detail);
            }
        }
        None => {
            let _ = writeln!(out, "Alert details unavailable");
        }
    }

    let _ = writeln!(out, "\n-- Recommendation --");
    let _ = writeln!(
        out,
        "{}",
        frame
            .recommendation
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or("Recommendation not available")
    );

    let _ = writeln!(out, "\n-- Vitals --");
    match frame.vitals.as_deref() {
        Some(vitals) if !vitals.is_empty() => {
            for v in vitals {
                let _ = writeln!(
                    out,
                    "BP {} | HR {} bpm | Temp {} F | Wt {} lbs | Ht {}\" | BMI {} | SpO2 {}% ({})",
                    or_na(&v.blood_pressure),
                    or_na(&v.heart_rate),
                    or_na(&v.temperature),
                    or_na(&v.weight),
                    or_na(&v.height),
                    or_na(&v.bmi),
                    or_na(&v.spo2),
                    or_na(&v.vitals_date_time)
                );
            }
        }
        _ => {
            let _ = writeln!(out, "No vital signs recorded");
        }
    }

    let _ = writeln!(out, "\n-- Medications --");
    match frame.medications.as_deref() {
        Some(meds) if !meds.is_empty() => {
            for m in meds {
                let _ = writeln!(
                    out,
                    "{} - {} (prescribed {})",
                    m.medication_name,
                    or_na(&m.medication_dose),
                    or_na(&m.medication_date_time)
                );
            }
        }
        _ => {
            let _ = writeln!(out, "No medications recorded");
        }
    }

    let _ = writeln!(out, "\n-- Lab Results --");
    match frame.labs.as_deref() {
        Some(labs) if !labs.is_empty() => {
            for l in labs {
                let _ = writeln!(
                    out,
                    "Na {} | K {} | BUN {} | Cr {} | Glu {} ({})",
                    or_na(&l.sodium),
                    or_na(&l.potassium),
                    or_na(&l.bun),
                    or_na(&l.creatinine),
                    or_na(&l.glucose),
                    or_na(&l.lab_date_time)
                );
            }
        }
        _ => {
            let _ = writeln!(out, "No lab results recorded");
        }
    }
    out
}

pub fn format_activities(activities: &[String]) -> String {
    let mut out = String::from("== Recent Activity ==\n");
    if activities.is_empty() {
        out.push_str("   No recent activities\n");
    }
    for a in activities {
        let _ = writeln!(out, " - {}", a);
    }
    out
}

pub fn format_notification(n: &Notification) -> String {
    format!("[#{} {}] {}", n.id, n.kind.label(), n.message)
}

pub struct TerminalListView {
    title: &'static str,
}

impl TerminalListView {
    pub fn new(title: &'static str) -> Self {
        Self { title }
    }
}

impl ListView for TerminalListView {
    fn render(&self, frame: &ListFrame) {
        println!("{}", format_list(self.title, frame));
    }
}

pub struct TerminalDetailView;

impl DetailView for TerminalDetailView {
    fn render(&self, frame: &DetailFrame) {
        println!("{}", format_detail(frame));
    }
}

pub struct TerminalActivityView;

impl ActivityView for TerminalActivityView {
    fn render(&self, activities: &[String]) {
        println!("{}", format_activities(activities));
    }
}

pub struct TerminalNotifications;

impl NotificationPresenter for TerminalNotifications {
    fn show(&self, notification: &Notification) {
        println!("{}", format_notification(notification));
    }

    fn remove(&self, _id: u64) {}
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&self) -> anyhow::Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}
