//! Message template resolution.
//!
//! Each event type owns an ordered rule set. Rules are evaluated top-down and
//! the first matching predicate picks the template; the set's fallback renders
//! when nothing matches. Order matters: a Volta-prequalification recipient
//! with the `volta` flag set still gets the qualified-lead template.

mod date;
mod messages;

use std::collections::HashSet;

use crate::config::RoutingConfig;
use crate::notification::{EventType, NotificationEvent};

pub use date::{format_literal, format_rome_today_offset, AppointmentDateMode, DateFormatter};

/// Inputs visible to rule predicates and template renderers
pub struct RenderContext<'a> {
    pub event: &'a NotificationEvent,
    pub routing: &'a RoutingSets,
    pub dates: &'a DateFormatter,
}

/// A `(predicate, template)` pair
pub struct Rule {
    pub name: &'static str,
    matches: fn(&RenderContext<'_>) -> bool,
    render: fn(&RenderContext<'_>) -> String,
}

/// Ordered rules plus the template used when none match
pub struct RuleSet {
    pub rules: &'static [Rule],
    pub fallback: Rule,
}

/// Output of a template resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Name of the rule that produced the text
    pub rule: &'static str,
    pub text: String,
}

/// Recipient id sets, indexed for membership checks
#[derive(Debug, Clone, Default)]
pub struct RoutingSets {
    pub volta_prequalification_ids: HashSet<String>,
    pub comparacorsi_ids: HashSet<String>,
    pub formatemp_id: Option<String>,
    pub epicode_id: Option<String>,
}

impl From<&RoutingConfig> for RoutingSets {
    fn from(config: &RoutingConfig) -> Self {
        Self {
            volta_prequalification_ids: config.volta_prequalification_ids.iter().cloned().collect(),
            comparacorsi_ids: config.comparacorsi_ids.iter().cloned().collect(),
            formatemp_id: config.formatemp_id.clone(),
            epicode_id: config.epicode_id.clone(),
        }
    }
}

static LEAD_NOTIFICATION_RULES: RuleSet = RuleSet {
    rules: &[
        Rule {
            name: "volta_prequalified",
            matches: |ctx| ctx.routing.volta_prequalification_ids.contains(ctx.event.recipient()),
            render: messages::qualified_volta,
        },
        Rule {
            name: "comparacorsi_prequalified",
            matches: |ctx| {
                ctx.event.flags.prequalification_moved
                    && ctx.routing.comparacorsi_ids.contains(ctx.event.recipient())
            },
            render: messages::qualified_comparacorsi,
        },
        Rule {
            name: "volta",
            matches: |ctx| ctx.event.flags.volta,
            render: messages::volta_lead,
        },
        Rule {
            name: "formatemp",
            matches: |ctx| ctx.routing.formatemp_id.as_deref() == Some(ctx.event.recipient()),
            render: messages::formatemp_lead,
        },
        Rule {
            name: "epicode",
            matches: |ctx| ctx.routing.epicode_id.as_deref() == Some(ctx.event.recipient()),
            render: messages::epicode_lead,
        },
    ],
    fallback: Rule {
        name: "new_lead",
        matches: |_| true,
        render: messages::new_lead,
    },
};

static LEAD_PREQUALIFIED_RULES: RuleSet = RuleSet {
    rules: &[Rule {
        name: "prequalified_sql",
        matches: |ctx| ctx.event.flags.new_status.as_deref() == Some("SQL"),
        render: messages::prequalified_sql,
    }],
    fallback: Rule {
        name: "prequalified_unreachable",
        matches: |_| true,
        render: messages::prequalified_unreachable,
    },
};

static APPOINTMENT_BOOKED_RULES: RuleSet = RuleSet {
    rules: &[],
    fallback: Rule {
        name: "appointment_booked",
        matches: |_| true,
        render: messages::appointment_booked,
    },
};

static LUISS_LEAD_RULES: RuleSet = RuleSet {
    rules: &[],
    fallback: Rule {
        name: "luiss_lead",
        matches: |_| true,
        render: messages::luiss_lead,
    },
};

/// Ordered rule set for an event type
pub fn rule_set(event_type: EventType) -> &'static RuleSet {
    match event_type {
        EventType::LeadNotification => &LEAD_NOTIFICATION_RULES,
        EventType::LeadPrequalified => &LEAD_PREQUALIFIED_RULES,
        EventType::AppointmentBooked => &APPOINTMENT_BOOKED_RULES,
        EventType::LuissLead => &LUISS_LEAD_RULES,
    }
}

/// Pure `(event, routing, dates) -> text` resolver
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    routing: RoutingSets,
    dates: DateFormatter,
}

impl TemplateResolver {
    pub fn new(routing: RoutingSets, dates: DateFormatter) -> Self {
        Self { routing, dates }
    }

    /// First rule whose predicate matches, or the set's fallback
    pub fn select(&self, event: &NotificationEvent) -> &'static Rule {
        let ctx = self.context(event);
        let set = rule_set(event.event_type);
        set.rules
            .iter()
            .find(|rule| (rule.matches)(&ctx))
            .unwrap_or(&set.fallback)
    }

    pub fn render(&self, event: &NotificationEvent) -> RenderedMessage {
        let ctx = self.context(event);
        let rule = self.select(event);
        RenderedMessage {
            rule: rule.name,
            text: (rule.render)(&ctx),
        }
    }

    fn context<'a>(&'a self, event: &'a NotificationEvent) -> RenderContext<'a> {
        RenderContext {
            event,
            routing: &self.routing,
            dates: &self.dates,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::notification::{Assignee, EventFlags, LeadFields};

    const VOLTA_PREQ: &str = "678f89da98becb24b578c3a5";
    const COMPARACORSI: &str = "64c8d506f67b84dfe65a2d8f";
    const FORMATEMP: &str = "68f8ae7dccb51d3308fea01a";
    const EPICODE: &str = "epicode-test-id";

    fn summer() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    fn resolver() -> TemplateResolver {
        let routing = RoutingConfig {
            epicode_id: Some(EPICODE.to_string()),
            ..RoutingConfig::default()
        };
        TemplateResolver::new(
            RoutingSets::from(&routing),
            DateFormatter::default().with_clock(summer),
        )
    }

    fn lead() -> LeadFields {
        LeadFields::new("Giulia", "Bianchi", "3331234567")
    }

    fn flags(volta: bool, moved: bool) -> EventFlags {
        EventFlags {
            volta,
            prequalification_moved: moved,
            new_status: None,
        }
    }

    fn rule_for(recipient: &str, flags: EventFlags) -> &'static str {
        resolver()
            .select(&NotificationEvent::lead_notification(recipient, lead(), flags))
            .name
    }

    #[test]
    fn test_lead_rule_order_is_fixed() {
        let names: Vec<_> = rule_set(EventType::LeadNotification)
            .rules
            .iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "volta_prequalified",
                "comparacorsi_prequalified",
                "volta",
                "formatemp",
                "epicode"
            ]
        );
        assert_eq!(rule_set(EventType::LeadNotification).fallback.name, "new_lead");
    }

    #[test]
    fn test_volta_prequalification_beats_volta_flag() {
        assert_eq!(rule_for(VOLTA_PREQ, flags(true, true)), "volta_prequalified");
        assert_eq!(rule_for(VOLTA_PREQ, flags(false, false)), "volta_prequalified");
    }

    #[test]
    fn test_comparacorsi_requires_moved_flag() {
        assert_eq!(rule_for(COMPARACORSI, flags(true, true)), "comparacorsi_prequalified");
        assert_eq!(rule_for(COMPARACORSI, flags(false, false)), "new_lead");
        assert_eq!(rule_for(COMPARACORSI, flags(true, false)), "volta");
    }

    #[test]
    fn test_moved_flag_alone_does_not_match_comparacorsi() {
        assert_eq!(rule_for("other", flags(false, true)), "new_lead");
    }

    #[test]
    fn test_volta_flag_beats_formatemp_and_epicode() {
        assert_eq!(rule_for(FORMATEMP, flags(true, false)), "volta");
        assert_eq!(rule_for(EPICODE, flags(true, false)), "volta");
    }

    #[test]
    fn test_formatemp_and_epicode() {
        assert_eq!(rule_for(FORMATEMP, flags(false, false)), "formatemp");
        assert_eq!(rule_for(EPICODE, flags(false, false)), "epicode");
        assert_eq!(rule_for("unknown", flags(false, false)), "new_lead");
    }

    #[test]
    fn test_epicode_rule_inactive_without_configured_id() {
        let resolver = TemplateResolver::new(
            RoutingSets::from(&RoutingConfig::default()),
            DateFormatter::default(),
        );
        let event = NotificationEvent::lead_notification("", lead(), EventFlags::default());
        assert_eq!(resolver.select(&event).name, "new_lead");
    }

    #[test]
    fn test_generic_lead_text() {
        let event = NotificationEvent::lead_notification("x", lead(), EventFlags::default());
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead! contattala subito.\n• Giulia Bianchi - 3331234567"
        );
    }

    #[test]
    fn test_generic_lead_with_assignee() {
        let mut fields = lead();
        fields.assignee = Some(Assignee::new("Luca", "Verdi"));
        let event = NotificationEvent::lead_notification("x", fields, EventFlags::default());
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead assegnata a Luca Verdi! contattala subito.\n• Giulia Bianchi - 3331234567"
        );
    }

    #[test]
    fn test_assignee_without_last_name_is_omitted() {
        let mut fields = lead();
        fields.assignee = Some(Assignee::new("Luca", ""));
        let event = NotificationEvent::lead_notification("x", fields, EventFlags::default());
        assert!(!resolver().render(&event).text.contains("assegnata"));
    }

    #[test]
    fn test_volta_text_with_utm_content() {
        let mut fields = lead();
        fields.utm_content = Some("ads-march".to_string());
        let event = NotificationEvent::lead_notification("x", fields, flags(true, false));
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead per istituto Volta! contattala subito.\n• Giulia Bianchi - 3331234567\n• ads-march"
        );
    }

    #[test]
    fn test_qualified_volta_text() {
        let mut fields = lead();
        fields.course_of_interest = Some("Infermieristica".to_string());
        let event = NotificationEvent::lead_notification(VOLTA_PREQ, fields, flags(true, false));
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead Qualificata! contattala subito.\n• Giulia Bianchi - 3331234567\n• Infermieristica\n• "
        );
    }

    #[test]
    fn test_qualified_comparacorsi_with_appointment() {
        let mut fields = lead();
        fields.appointment = Some("2025-03-10T09:00:00Z".to_string());
        let event = NotificationEvent::lead_notification(COMPARACORSI, fields, flags(false, true));
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead Qualificata! contattala subito.\n• Giulia Bianchi - 3331234567 \n• Appuntamento: 10/03/2025 alle 11:00"
        );
    }

    #[test]
    fn test_formatemp_text() {
        let mut fields = lead();
        fields.campaign = Some("Primavera".to_string());
        let event = NotificationEvent::lead_notification(FORMATEMP, fields, EventFlags::default());
        let rendered = resolver().render(&event);
        assert_eq!(rendered.rule, "formatemp");
        assert_eq!(
            rendered.text,
            "È entrata una nuova lead per Formatemp! contattala subito.\n• Giulia Bianchi - 3331234567\n• Campagna: Primavera"
        );
    }

    #[test]
    fn test_epicode_text() {
        let mut fields = lead();
        fields.course = Some("Full Stack".to_string());
        fields.utm_medium = Some("cpc".to_string());
        let event = NotificationEvent::lead_notification(EPICODE, fields, EventFlags::default());
        assert_eq!(
            resolver().render(&event).text,
            "È entrata una nuova lead per Epicode! contattala subito.\n• Giulia Bianchi - 3331234567\n• Corso: Full Stack\n• utm_medium: cpc"
        );
    }

    #[test]
    fn test_prequalified_branches_on_sql_only() {
        let resolver = resolver();
        let sql = NotificationEvent::lead_prequalified("x", lead(), Some("SQL".to_string()));
        let other = NotificationEvent::lead_prequalified("x", lead(), Some("sql".to_string()));
        let missing = NotificationEvent::lead_prequalified("x", lead(), None);

        assert_eq!(resolver.select(&sql).name, "prequalified_sql");
        assert_eq!(resolver.select(&other).name, "prequalified_unreachable");
        assert_eq!(resolver.select(&missing).name, "prequalified_unreachable");
    }

    #[test]
    fn test_prequalified_texts() {
        let mut fields = lead();
        fields.assignee = Some(Assignee::new("Luca", "Verdi"));
        fields.appointment = Some("2025-03-10T09:00:00Z".to_string());

        let sql = NotificationEvent::lead_prequalified("x", fields.clone(), Some("SQL".to_string()));
        assert_eq!(
            resolver().render(&sql).text,
            "È entrata una nuova lead Qualificata assegnata a Luca Verdi! contattala subito.\n• Giulia Bianchi - 3331234567\n• Appuntamento: 10/03/2025 alle 11:00"
        );

        let unreachable = NotificationEvent::lead_prequalified("x", fields, Some("KO".to_string()));
        assert_eq!(
            resolver().render(&unreachable).text,
            "Lead non raggiungibile assegnata a Luca Verdi, da richiamare.\n• Giulia Bianchi - 3331234567"
        );
    }

    #[test]
    fn test_appointment_booked_text() {
        let mut fields = lead();
        fields.appointment = Some("2025-03-10T09:00:00Z".to_string());
        let event = NotificationEvent::appointment_booked(FORMATEMP, fields);
        let rendered = resolver().render(&event);
        assert_eq!(rendered.rule, "appointment_booked");
        assert_eq!(
            rendered.text,
            "È stato fissato un nuovo appuntamento!\n• Giulia Bianchi - 3331234567\n• Appuntamento: 10/03/2025 alle 11:00"
        );
    }

    #[test]
    fn test_luiss_text_ignores_flags() {
        let mut event = NotificationEvent::luiss_lead(lead());
        event.flags.volta = true;
        let rendered = resolver().render(&event);
        assert_eq!(rendered.rule, "luiss_lead");
        assert_eq!(
            rendered.text,
            "È entrata una nuova lead! contattala subito.\n• Giulia Bianchi - 3331234567"
        );
    }
}
