//! Entity type inference from operation names and request paths

/// Checked in order against the uppercased operation name.
///
/// The approval stem sits ahead of every entity stem except USER, so any
/// approval operation (`APPROVE_LEAVE`, `APPROVE_HOLIDAY`) is labelled as
/// the leave application being decided on.
const OPERATION_KEYWORDS: [(&str, &str); 7] = [
    ("USER", "User"),
    ("APPROV", "LeaveApplication"),
    ("LEAVE", "Leave"),
    ("HOLIDAY", "Holiday"),
    ("NOTIFICATION", "Notification"),
    ("REPORT", "Report"),
    ("ADMIN", "Admin"),
];

/// Checked in order against the lowercased request path
const PATH_KEYWORDS: [(&str, &str); 6] = [
    ("/users", "User"),
    ("/leave", "Leave"),
    ("/holidays", "Holiday"),
    ("/notifications", "Notification"),
    ("/approval", "LeaveApplication"),
    ("/reports", "Report"),
];

/// Infer an entity label for an operation that did not declare one.
///
/// A match on the operation name always beats a match on the path.
pub fn infer_entity_type(operation: Option<&str>, request_uri: Option<&str>) -> Option<&'static str> {
    let by_operation = operation.and_then(|op| {
        let op = op.to_uppercase();
        OPERATION_KEYWORDS
            .iter()
            .find(|(keyword, _)| op.contains(keyword))
            .map(|(_, label)| *label)
    });

    by_operation.or_else(|| {
        request_uri.and_then(|uri| {
            let uri = uri.to_lowercase();
            PATH_KEYWORDS
                .iter()
                .find(|(keyword, _)| uri.contains(keyword))
                .map(|(_, label)| *label)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_operation_name_beats_path() {
        assert_eq!(
            infer_entity_type(Some("APPROVE_LEAVE"), Some("/api/admin/dashboard-stats")),
            Some("LeaveApplication")
        );
        assert_eq!(
            infer_entity_type(Some("CANCEL_LEAVE"), Some("/api/holidays/5")),
            Some("Leave")
        );
    }

    #[test]
    fn test_table_order_decides_between_operation_keywords() {
        assert_eq!(infer_entity_type(Some("USER_LEAVE_SUMMARY"), None), Some("User"));
        assert_eq!(infer_entity_type(Some("ADMIN_REPORT"), None), Some("Report"));
        assert_eq!(infer_entity_type(Some("ADMIN_RESET"), None), Some("Admin"));
    }

    #[test]
    fn test_approval_maps_to_leave_application() {
        assert_eq!(
            infer_entity_type(Some("PROCESS_APPROVAL"), None),
            Some("LeaveApplication")
        );
        assert_eq!(
            infer_entity_type(Some("DO_THING"), Some("/api/approval/3")),
            Some("LeaveApplication")
        );
    }

    #[test]
    fn test_approval_stem_precedes_entity_stems() {
        assert_eq!(
            infer_entity_type(Some("APPROVE_HOLIDAY"), None),
            Some("LeaveApplication")
        );
        assert_eq!(
            infer_entity_type(Some("REJECT_LEAVE_APPROVAL_REPORT"), None),
            Some("LeaveApplication")
        );
        assert_eq!(infer_entity_type(Some("USER_APPROVAL"), None), Some("User"));
    }

    #[test]
    fn test_path_used_when_operation_has_no_keyword() {
        assert_eq!(
            infer_entity_type(Some("DO_THING"), Some("/api/holidays/5")),
            Some("Holiday")
        );
        assert_eq!(
            infer_entity_type(Some("DO_THING"), Some("/API/Users/9")),
            Some("User")
        );
    }

    #[test]
    fn test_operation_match_is_case_insensitive() {
        assert_eq!(infer_entity_type(Some("createHoliday"), None), Some("Holiday"));
    }

    #[test]
    fn test_no_match_is_absent() {
        assert_eq!(infer_entity_type(Some("DO_THING"), Some("/api/misc")), None);
        assert_eq!(infer_entity_type(None, None), None);
    }

    proptest! {
        #[test]
        fn prop_operation_keyword_always_wins(
            prefix in "[A-Z_]{0,8}",
            idx in 0usize..OPERATION_KEYWORDS.len(),
            path in "/[a-z/]{0,20}",
        ) {
            let (keyword, _) = OPERATION_KEYWORDS[idx];
            let op = format!("{prefix}{keyword}");
            let from_op_only = infer_entity_type(Some(&op), None);
            prop_assert!(from_op_only.is_some());
            prop_assert_eq!(infer_entity_type(Some(&op), Some(&path)), from_op_only);
        }

        #[test]
        fn prop_inference_is_total(op in ".{0,40}", path in ".{0,40}") {
            let _ = infer_entity_type(Some(&op), Some(&path));
        }
    }
}
