//! Human-facing setup instructions
//!
//! Presentation only, but the listed policies must stay consistent with
//! the classification policy table in `agb-core`.

/// Render the Authentik configuration walkthrough with the bridge's
/// webhook URL filled in.
pub fn setup_guide(webhook_url: &str) -> String {
    format!(
        "Steps to configure Authentik webhooks for Gotify:

  Create a Notification Transport in Authentik with the mode 'Webhook (generic)'.

  Copy this URL: {webhook_url} and paste it in 'Webhook URL'.

  Keep the 'Webhook Mapping' field empty.

  Make sure to enable the 'Send once' option.

  Create a Notification Rule:
  - Assign the rule to a group, such as 'authentik Admins'.
  - Set the newly created transport as the delivery method.
  - Select Severity: 'Notice'.

  Create and bind two policies:
  - Policy 1:
    - Action: Login Failed
    - The rest stays empty

  - Policy 2:
    - Action: Login
    - The rest stays empty

  Other event types are not currently supported for parsing but will
  still be delivered to Gotify, though without proper parsing."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agb_core::classify::ClassificationPolicy;

    #[test]
    fn test_guide_contains_webhook_url() {
        let guide = setup_guide("http://bridge.example.com/authentik");
        assert!(guide.contains("http://bridge.example.com/authentik"));
    }

    #[test]
    fn test_guide_mentions_every_recognized_action() {
        // The guide lists actions in Authentik's display form; keep it in
        // sync with the policy table.
        let guide = setup_guide("http://x/authentik");
        for action in ClassificationPolicy::new().recognized_actions() {
            let display = match action {
                "login" => "Action: Login",
                "login_failed" => "Action: Login Failed",
                other => panic!("setup guide has no wording for action {:?}", other),
            };
            assert!(guide.contains(display));
        }
    }
}
