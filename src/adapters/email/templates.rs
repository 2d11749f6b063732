//! Subject and body text for each notification kind.

use crate::domain::billing::{Notification, NotificationKind};
use crate::ports::VendorInfo;

/// A rendered email ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Render the email for `kind`.
///
/// `dashboard_url` is where the vendor goes to pay.
pub fn render(
    kind: NotificationKind,
    vendor: &VendorInfo,
    notification: &Notification,
    dashboard_url: &str,
) -> RenderedEmail {
    let period_end = notification.current_period_end.date().format("%B %-d, %Y").to_string();

    let (subject, lines) = match kind {
        NotificationKind::ExpiryWarning => (
            format!("Your {} subscription ends on {}", vendor.store_name, period_end),
            vec![
                format!("Your store subscription for {} ends on {}.", vendor.store_name, period_end),
                "Renew now to keep your store visible to customers.".to_string(),
            ],
        ),
        NotificationKind::GraceWarning => {
            let grace_end = notification
                .grace_end
                .map(|t| t.date().format("%B %-d, %Y").to_string())
                .unwrap_or_else(|| "soon".to_string());
            (
                format!("Action needed: {} subscription has expired", vendor.store_name),
                vec![
                    format!("Your subscription for {} expired on {}.", vendor.store_name, period_end),
                    format!("Your store stays visible until {}. After that it will be hidden.", grace_end),
                ],
            )
        }
        NotificationKind::Frozen => (
            format!("{} has been hidden from customers", vendor.store_name),
            vec![
                format!("We could not confirm payment for {}, so the store is now hidden.", vendor.store_name),
                "Pay your subscription to restore it immediately.".to_string(),
            ],
        ),
        NotificationKind::Reactivated => (
            format!("{} is live again", vendor.store_name),
            vec![
                format!("Thanks for your payment. {} is visible to customers again.", vendor.store_name),
                format!("Your next renewal is due on {}.", period_end),
            ],
        ),
    };

    let greeting = format!("Hi {},", vendor.display_name);
    let cta = format!("Manage your subscription: {}", dashboard_url);

    let text = std::iter::once(greeting.clone())
        .chain(lines.iter().cloned())
        .chain(std::iter::once(cta))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut html = format!("<p>{}</p>", escape(&greeting));
    for line in &lines {
        html.push_str(&format!("<p>{}</p>", escape(line)));
    }
    html.push_str(&format!(
        "<p><a href=\"{}\">Manage your subscription</a></p>",
        escape(dashboard_url)
    ));

    RenderedEmail { subject, html, text }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{NotificationKey, PeriodKey};
    use crate::domain::foundation::{StoreId, Timestamp, VendorId};

    fn vendor() -> VendorInfo {
        VendorInfo {
            vendor_id: VendorId::new("vendor-1").unwrap(),
            store_id: StoreId::new("store-1").unwrap(),
            email: "vendor@example.com".to_string(),
            display_name: "Ada".to_string(),
            store_name: "Ada & Co".to_string(),
        }
    }

    fn notification(kind: NotificationKind) -> Notification {
        let period_end = Timestamp::parse_rfc3339("2026-06-01T00:00:00Z").unwrap();
        Notification {
            key: NotificationKey {
                vendor_id: VendorId::new("vendor-1").unwrap(),
                kind,
                period_key: PeriodKey::of(period_end),
            },
            current_period_end: period_end,
            grace_end: Some(period_end.add_days(5)),
            frozen_at: None,
        }
    }

    #[test]
    fn grace_warning_mentions_grace_end() {
        let email = render(
            NotificationKind::GraceWarning,
            &vendor(),
            &notification(NotificationKind::GraceWarning),
            "https://shop.example.com/dashboard",
        );
        assert!(email.text.contains("June 6, 2026"));
        assert!(email.subject.contains("expired"));
    }

    #[test]
    fn html_is_escaped() {
        let email = render(
            NotificationKind::Frozen,
            &vendor(),
            &notification(NotificationKind::Frozen),
            "https://shop.example.com/dashboard",
        );
        assert!(email.html.contains("Ada &amp; Co"));
        assert!(!email.html.contains("Ada & Co"));
    }

    #[test]
    fn every_kind_links_dashboard() {
        for kind in [
            NotificationKind::ExpiryWarning,
            NotificationKind::GraceWarning,
            NotificationKind::Frozen,
            NotificationKind::Reactivated,
        ] {
            let email = render(kind, &vendor(), &notification(kind), "https://d.example.com");
            assert!(email.text.contains("https://d.example.com"), "{}", kind);
        }
    }
}
