//! Message bodies. Wording is relied upon by the recipients' staff, keep it verbatim.

use crate::notification::{non_empty, LeadFields};

use super::RenderContext;

/// ` assegnata a Nome Cognome` or nothing
fn assignee_fragment(lead: &LeadFields) -> String {
    lead.assignee_name()
        .map(|name| format!(" assegnata a {}", name))
        .unwrap_or_default()
}

/// `• Nome Cognome - telefono`
fn contact_line(lead: &LeadFields) -> String {
    format!("• {} {} - {}", lead.first_name, lead.last_name, lead.phone)
}

fn appointment_line(ctx: &RenderContext<'_>) -> String {
    non_empty(&ctx.event.lead.appointment)
        .map(|raw| format!("\n• Appuntamento: {}", ctx.dates.format(raw)))
        .unwrap_or_default()
}

pub(super) fn new_lead(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "È entrata una nuova lead{}! contattala subito.\n{}",
        assignee_fragment(lead),
        contact_line(lead)
    )
}

pub(super) fn volta_lead(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    let utm = non_empty(&lead.utm_content)
        .map(|utm| format!("\n• {}", utm))
        .unwrap_or_default();
    format!(
        "È entrata una nuova lead{} per istituto Volta! contattala subito.\n{}{}",
        assignee_fragment(lead),
        contact_line(lead),
        utm
    )
}

pub(super) fn qualified_volta(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "È entrata una nuova lead Qualificata! contattala subito.\n{}\n• {}\n• {}",
        contact_line(lead),
        lead.course_of_interest.as_deref().unwrap_or_default(),
        lead.province.as_deref().unwrap_or_default()
    )
}

pub(super) fn qualified_comparacorsi(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    // The space after the phone number is part of the upstream format
    format!(
        "È entrata una nuova lead Qualificata{}! contattala subito.\n{} {}",
        assignee_fragment(lead),
        contact_line(lead),
        appointment_line(ctx)
    )
}

pub(super) fn formatemp_lead(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "È entrata una nuova lead per Formatemp! contattala subito.\n{}\n• Campagna: {}",
        contact_line(lead),
        lead.campaign.as_deref().unwrap_or_default()
    )
}

pub(super) fn epicode_lead(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "È entrata una nuova lead per Epicode! contattala subito.\n{}\n• Corso: {}\n• utm_medium: {}",
        contact_line(lead),
        lead.course.as_deref().unwrap_or_default(),
        lead.utm_medium.as_deref().unwrap_or_default()
    )
}

pub(super) fn prequalified_sql(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "È entrata una nuova lead Qualificata{}! contattala subito.\n{}{}",
        assignee_fragment(lead),
        contact_line(lead),
        appointment_line(ctx)
    )
}

pub(super) fn prequalified_unreachable(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    format!(
        "Lead non raggiungibile{}, da richiamare.\n{}",
        assignee_fragment(lead),
        contact_line(lead)
    )
}

pub(super) fn appointment_booked(ctx: &RenderContext<'_>) -> String {
    let lead = &ctx.event.lead;
    let when = lead
        .appointment
        .as_deref()
        .map(|raw| ctx.dates.format(raw))
        .unwrap_or_default();
    format!(
        "È stato fissato un nuovo appuntamento!\n{}\n• Appuntamento: {}",
        contact_line(lead),
        when
    )
}

pub(super) fn luiss_lead(ctx: &RenderContext<'_>) -> String {
    format!(
        "È entrata una nuova lead! contattala subito.\n{}",
        contact_line(&ctx.event.lead)
    )
}
