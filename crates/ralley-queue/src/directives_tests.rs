
    use super::*;
    use crate::retry::Backoff;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let directives = Directives::extract(&BTreeMap::new(), &BTreeMap::new());
        assert_eq!(directives, Directives::default());
        assert_eq!(directives.key, "default");
    }

    #[test]
    fn test_header_wins_over_param() {
        let headers = map(&[("x-ralley-delay", "10")]);
        let params = map(&[("_delay", "99"), ("_interval", "30")]);
        let directives = Directives::extract(&headers, &params);

        assert_eq!(directives.delay, Some(10.0));
        assert_eq!(directives.interval, Some(30.0));
    }

    #[test]
    fn test_no_conflict_ignores_params() {
        let headers = map(&[(NO_CONFLICT_HEADER, "1")]);
        let params = map(&[("_delay", "99"), ("_key", "k")]);
        let directives = Directives::extract(&headers, &params);

        assert_eq!(directives.delay, None);
        assert_eq!(directives.key, "default");
    }

    #[test]
    fn test_no_conflict_truthiness() {
        assert!(no_conflict(&map(&[(NO_CONFLICT_HEADER, "true")])));
        assert!(!no_conflict(&map(&[(NO_CONFLICT_HEADER, "")])));
        assert!(!no_conflict(&map(&[(NO_CONFLICT_HEADER, "0")])));
        assert!(!no_conflict(&map(&[(NO_CONFLICT_HEADER, "False")])));
        assert!(!no_conflict(&BTreeMap::new()));
    }

    #[test]
    fn test_empty_and_invalid_values_are_absent() {
        let headers = map(&[("x-ralley-delay", ""), ("x-ralley-interval", "soon")]);
        let params = map(&[("_delay", "4")]);
        let directives = Directives::extract(&headers, &params);

        assert_eq!(directives.delay, Some(4.0));
        assert_eq!(directives.interval, None);
    }

    #[test]
    fn test_retry_and_cron() {
        let headers = map(&[
            ("x-ralley-retry", "3|EXPONENTIAL|2"),
            ("x-ralley-cron", "0|9|*|*|1,30 * * * *"),
        ]);
        let directives = Directives::extract(&headers, &BTreeMap::new());

        let retry = directives.retry.unwrap();
        assert_eq!(retry.max, 3);
        assert_eq!(retry.backoff, Backoff::Exponential);

        let cron = directives.cron.unwrap();
        assert_eq!(cron.len(), 2);
        assert_eq!(cron[0], vec!["0", "9", "*", "*", "1"]);
        assert_eq!(cron[1][0], "30");
    }

    #[test]
    fn test_parse_cron_empty() {
        assert_eq!(parse_cron(""), None);
        assert_eq!(parse_cron(" , |"), None);
    }

    #[test]
    fn test_start() {
        let received = 1_000.0;
        assert_eq!(Directives::default().start(received), received);

        let delayed = Directives {
            delay: Some(30.0),
            ..Default::default()
        };
        assert_eq!(delayed.start(received), 1_030.0);

        let until = Directives {
            delay: Some(30.0),
            delay_until: Some(5_000.0),
            ..Default::default()
        };
        assert_eq!(until.start(received), 5_000.0);

        let overflowing = Directives {
            delay: Some(f64::MAX),
            ..Default::default()
        };
        assert_eq!(overflowing.start(f64::MAX), f64::MAX);
    }

    #[test]
    fn test_delay_until_serialized_name() {
        let directives = Directives {
            delay_until: Some(5.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&directives).unwrap();
        assert_eq!(json["delayuntil"], 5.0);
        assert_eq!(json["key"], "default");
    }
