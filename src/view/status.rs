/// Display labels for the upstream order status codes.
pub const STATUS_LABELS: &[(&str, &str)] = &[
    ("PAYMENT_WAITING", "입금대기"),
    ("PAYED", "결제완료 (신규주문)"),
    ("DELIVERING", "배송중"),
    ("DELIVERED", "배송완료"),
    ("PURCHASE_DECIDED", "구매확정"),
    ("EXCHANGED", "교환"),
    ("CANCELED", "취소"),
    ("RETURNED", "반품"),
    ("CANCELED_BY_NOPAYMENT", "미입금취소"),
    ("PRODUCT_PREPARE", "발송대기 (상품준비중)"),
    ("DELIVERY_PREPARE", "발송대기 (배송준비중)"),
];

/// Label for the "no status filter" option.
pub const ALL_STATUSES_LABEL: &str = "전체 상태";

/// Localized label for a status code. Unknown codes are shown as-is.
pub fn status_label(code: &str) -> &str {
    STATUS_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// Payment received or waiting, or being prepared for dispatch.
    Paid,
    InDelivery,
    /// Canceled, returned or exchanged.
    Canceled,
    Default,
}

impl StatusClass {
    pub fn css_class(self) -> &'static str {
        match self {
            StatusClass::Paid => "status-payed",
            StatusClass::InDelivery => "status-dispatched",
            StatusClass::Canceled => "status-canceled",
            StatusClass::Default => "status-default",
        }
    }
}

impl std::fmt::Display for StatusClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.css_class())
    }
}

/// Checked in order; the first rule with a matching token wins.
/// `PRODUCT_PREPARE`/`DELIVERY_PREPARE` land in `Paid` because that rule comes first.
const CLASS_RULES: &[(&[&str], StatusClass)] = &[
    (&["PAYED", "PAYMENT", "PREPARE"], StatusClass::Paid),
    (&["DELIVER"], StatusClass::InDelivery),
    (&["CANCEL", "RETURN", "EXCHANGE"], StatusClass::Canceled),
];

/// Severity bucket for a status code (case-insensitive substring match).
pub fn status_class(code: &str) -> StatusClass {
    if code.is_empty() {
        return StatusClass::Default;
    }
    let upper = code.to_uppercase();
    CLASS_RULES
        .iter()
        .find(|(tokens, _)| tokens.iter().any(|t| upper.contains(t)))
        .map(|(_, class)| *class)
        .unwrap_or(StatusClass::Default)
}
