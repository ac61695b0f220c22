use bloodsync::{can_donate, days_since_donation, is_eligible, match_donors, BloodType, Donor};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn blood_type() -> impl Strategy<Value = BloodType> {
    prop::sample::select(BloodType::ALL.to_vec())
}

fn donor() -> impl Strategy<Value = Donor> {
    (blood_type(), any::<bool>()).prop_map(|(bt, available)| Donor::new(bt, available))
}

proptest! {
    #[test]
    fn every_type_donates_to_and_receives_from_itself(bt in blood_type()) {
        let rule = bt.compatibility();
        prop_assert!(rule.can_donate_to.contains(&bt));
        prop_assert!(rule.can_receive_from.contains(&bt));
    }

    #[test]
    fn universal_donor_and_recipient(bt in blood_type()) {
        prop_assert!(bt.compatibility().can_receive_from.contains(&BloodType::ONegative));
        prop_assert!(BloodType::ABPositive.compatibility().can_receive_from.contains(&bt));
        prop_assert!(BloodType::ONegative.compatibility().can_donate_to.contains(&bt));
    }

    #[test]
    fn donate_and_receive_are_inverse(donor_type in blood_type(), recipient in blood_type()) {
        prop_assert_eq!(
            donor_type.can_donate_to(recipient),
            recipient.can_receive_from(donor_type)
        );
    }

    #[test]
    fn matched_donors_are_available_and_compatible(
        donors in prop::collection::vec(donor(), 0..40),
        requested in blood_type()
    ) {
        let matched = match_donors(&donors, requested.label());
        for d in &matched {
            prop_assert!(d.available);
            prop_assert!(d.blood_type.can_donate_to(requested));
        }

        // Stable filter: matches appear in input order
        let expected: Vec<&Donor> = donors
            .iter()
            .filter(|d| d.available && d.blood_type.can_donate_to(requested))
            .collect();
        prop_assert_eq!(matched, expected);
    }

    #[test]
    fn eligibility_matches_bounds(age in 0i64..120, weight in 1.0f64..200.0) {
        let expected = (18..=65).contains(&age) && weight >= 50.0;
        prop_assert_eq!(is_eligible(age, weight).unwrap(), expected);
    }

    #[test]
    fn interval_threshold(days_ago in 0i64..400) {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let last = today - Duration::days(days_ago);

        prop_assert_eq!(days_since_donation(Some(last), today), Some(days_ago));
        prop_assert_eq!(can_donate(Some(last), today), days_ago >= 56);
    }
}
