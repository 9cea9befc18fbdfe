use crate::error::AppError;
use crate::types::{Product, ProductOption};
use crate::view::html::{escape, render_error};

/// Products whose name contains this are listed after everything else.
pub const BALLOON_MARKER: &str = "풍선";
pub const NO_OPTIONS_TEXT: &str = "옵션 정보 없음";
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Stable: relative order is kept inside both partitions.
pub fn sort_products(products: &mut [Product]) {
    products.sort_by_key(|p| p.name().contains(BALLOON_MARKER));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Zero,
    Low,
    Normal,
}

impl StockLevel {
    pub fn of(stock: i64) -> Self {
        if stock == 0 {
            StockLevel::Zero
        } else if stock < LOW_STOCK_THRESHOLD {
            StockLevel::Low
        } else {
            StockLevel::Normal
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            StockLevel::Zero => "zero",
            StockLevel::Low => "low",
            StockLevel::Normal => "",
        }
    }
}

/// `1234567` → `1,234,567`.
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn option_item(option: &ProductOption) -> String {
    let stock = option.stock();
    format!(
        "<div class=\"option-item {}\"><span class=\"option-name\">{}</span><span class=\"option-stock\">{}개</span></div>",
        StockLevel::of(stock).css_class(),
        escape(option.name()),
        thousands(stock)
    )
}

pub fn render_product_card(product: &Product) -> String {
    let options = if product.options.is_empty() {
        format!("<div class=\"no-options\">{NO_OPTIONS_TEXT}</div>")
    } else {
        let items: String = product.options.iter().map(option_item).collect();
        format!("<div class=\"options-title\">📦 옵션별 재고</div><div class=\"option-list\">{items}</div>")
    };

    format!(
        concat!(
            "<div class=\"product-card\">",
            "<div class=\"product-header\">",
            "<div class=\"product-name\">{}</div>",
            "<div class=\"product-info\">",
            "<span class=\"badge badge-sale\">{}</span>",
            "<span class=\"price\">{}원</span>",
            "</div></div>",
            "<div class=\"total-stock\">",
            "<div class=\"total-stock-label\">전체 재고</div>",
            "<div class=\"total-stock-value\">{}개</div>",
            "</div>",
            "{}",
            "</div>",
        ),
        escape(product.name()),
        escape(product.status()),
        thousands(product.price()),
        thousands(product.total_stock()),
        options,
    )
}

/// Sorted card grid (`#productsGrid` contents).
pub fn render_products(mut products: Vec<Product>) -> String {
    sort_products(&mut products);
    let cards: String = products.iter().map(render_product_card).collect();
    format!("<div id=\"productsGrid\">{cards}</div>")
}

/// Error block for the product grid. A message the backend put in its body
/// is shown as-is; transport and decode failures get the generic prefix.
pub fn render_products_error(err: &AppError) -> String {
    match err {
        AppError::Backend { message, .. } => format!("<div class=\"error\">{}</div>", escape(message)),
        other => render_error(&other.user_message()),
    }
}
