#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.booking.slot_minutes, 60);
        assert_eq!(config.booking.working_days, vec!["mon", "tue", "wed", "thu", "fri"]);
        assert_eq!(config.mail.transport, "log");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [booking]
            slot_minutes = 30
            working_days = ["sat", "sun"]

            [auth]
            admin_emails = ["Ops@Developer.ae"]
            "#,
        )
        .unwrap();
        assert_eq!(config.booking.slot_minutes, 30);
        assert_eq!(config.booking.day_start, "09:00");
        assert_eq!(config.booking.weekdays().unwrap(), vec![Weekday::Sat, Weekday::Sun]);
        assert_eq!(config.auth.magic_link_ttl_minutes, 1440);
    }

    #[test]
    fn test_mail_api_key_is_secret() {
        let config = Config::from_toml_str(
            r#"
            [mail]
            transport = "http"
            endpoint = "https://mail.example.com/send"
            api_key = "sk-live-123"
            "#,
        )
        .unwrap();
        let key = config.mail.api_key.as_ref().unwrap();
        assert_eq!(key.expose_secret(), "sk-live-123");
        assert!(!format!("{:?}", config.mail).contains("sk-live-123"));
    }

    #[test]
    fn test_validate_rejects_inverted_day() {
        let mut config = Config::default();
        config.booking.day_start = "18:00".into();
        assert_eq!(config.validate(), Err(ConfigError::EmptyBookingDay));
    }

    #[test]
    fn test_validate_rejects_bad_time_and_weekday() {
        let mut config = Config::default();
        config.booking.day_end = "5pm".into();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTime { .. })));

        let mut config = Config::default();
        config.booking.working_days = vec!["funday".into()];
        assert_eq!(config.validate(), Err(ConfigError::InvalidWeekday("funday".into())));
    }

    #[test]
    fn test_http_transport_requires_endpoint() {
        let mut config = Config::default();
        config.mail.transport = "http".into();
        assert_eq!(config.validate(), Err(ConfigError::MissingMailEndpoint));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "HANDOVER_DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "HANDOVER_ADMIN_EMAILS" => Some(" a@x.com, ,b@x.com ".to_string()),
            _ => None,
        });
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.auth.admin_emails, vec!["a@x.com", "b@x.com"]);
        assert_eq!(config.server.bind, "127.0.0.1:3001");
    }

    #[test]
    fn test_empty_admin_list_rejected() {
        let mut config = Config::default();
        config.auth.admin_emails = vec![" ".into()];
        assert_eq!(config.validate(), Err(ConfigError::NoAdmins));
    }

    #[test]
    fn test_validate_bounds_booking_window() {
        let mut config = Config::default();
        config.booking.max_advance_days = 1_000_000_000;
        assert_eq!(config.validate(), Err(ConfigError::BookingWindowOutOfRange));

        let mut config = Config::default();
        config.booking.min_notice_days = -1;
        assert_eq!(config.validate(), Err(ConfigError::BookingWindowOutOfRange));

        let mut config = Config::default();
        config.booking.min_notice_days = 10;
        config.booking.max_advance_days = 5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBookingWindow));

        let mut config = Config::default();
        config.booking.max_advance_days = MAX_BOOKING_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_link_lifetimes() {
        let mut config = Config::default();
        config.auth.magic_link_ttl_minutes = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMagicLinkTtl));

        let mut config = Config::default();
        config.auth.magic_link_ttl_minutes = i64::MAX;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMagicLinkTtl));

        let mut config = Config::default();
        config.auth.developer_link_ttl_hours = MAX_DEVELOPER_LINK_TTL_HOURS + 1;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDeveloperLinkTtl));
    }
}
