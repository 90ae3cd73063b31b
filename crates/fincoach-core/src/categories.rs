//! Static category table
//!
//! Transactions and budgets reference categories by id. The table is fixed;
//! unknown ids are still accepted on transactions and render as-is.

use serde::Serialize;

/// One category entry
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub name: &'static str,
    /// Display colour (hex)
    pub color: &'static str,
    pub subcategories: &'static [&'static str],
}

pub const EXPENSE_CATEGORIES: [Category; 13] = [
    Category {
        id: "food_dining",
        name: "Food & Dining",
        color: "#f97316",
        subcategories: &["Groceries", "Restaurants", "Coffee", "Fast Food", "Delivery"],
    },
    Category {
        id: "shopping",
        name: "Shopping",
        color: "#ec4899",
        subcategories: &[
            "Clothing",
            "Electronics",
            "Home Goods",
            "Personal Care",
            "Online Shopping",
        ],
    },
    Category {
        id: "transportation",
        name: "Transportation",
        color: "#3b82f6",
        subcategories: &["Gas", "Public Transit", "Uber/Lyft", "Parking", "Car Maintenance"],
    },
    Category {
        id: "housing",
        name: "Housing",
        color: "#8b5cf6",
        subcategories: &["Rent", "Mortgage", "Insurance", "Repairs", "Furniture"],
    },
    Category {
        id: "utilities",
        name: "Utilities",
        color: "#eab308",
        subcategories: &["Electric", "Gas", "Water", "Internet", "Phone"],
    },
    Category {
        id: "entertainment",
        name: "Entertainment",
        color: "#06b6d4",
        subcategories: &["Movies", "Games", "Streaming", "Events", "Hobbies"],
    },
    Category {
        id: "health",
        name: "Health & Wellness",
        color: "#ef4444",
        subcategories: &["Medical", "Pharmacy", "Gym", "Mental Health", "Vision/Dental"],
    },
    Category {
        id: "education",
        name: "Education",
        color: "#10b981",
        subcategories: &["Tuition", "Books", "Courses", "Supplies", "Student Loans"],
    },
    Category {
        id: "work",
        name: "Work & Business",
        color: "#6366f1",
        subcategories: &["Office Supplies", "Software", "Equipment", "Professional Services"],
    },
    Category {
        id: "gifts",
        name: "Gifts & Donations",
        color: "#f43f5e",
        subcategories: &["Gifts", "Charity", "Donations"],
    },
    Category {
        id: "travel",
        name: "Travel",
        color: "#0ea5e9",
        subcategories: &["Flights", "Hotels", "Vacation", "Travel Insurance"],
    },
    Category {
        id: "subscriptions",
        name: "Subscriptions",
        color: "#a855f7",
        subcategories: &["Streaming", "Software", "Memberships", "News/Media"],
    },
    Category {
        id: "other",
        name: "Other",
        color: "#6b7280",
        subcategories: &["Miscellaneous"],
    },
];

pub const INCOME_CATEGORIES: [Category; 5] = [
    Category {
        id: "salary",
        name: "Salary",
        color: "#10b981",
        subcategories: &["Regular Pay", "Bonus", "Commission"],
    },
    Category {
        id: "freelance",
        name: "Freelance",
        color: "#3b82f6",
        subcategories: &["Consulting", "Gig Work", "Side Projects"],
    },
    Category {
        id: "investments",
        name: "Investments",
        color: "#8b5cf6",
        subcategories: &["Dividends", "Interest", "Capital Gains"],
    },
    Category {
        id: "gifts_income",
        name: "Gifts",
        color: "#f43f5e",
        subcategories: &["Family", "Friends", "Other"],
    },
    Category {
        id: "other_income",
        name: "Other Income",
        color: "#6b7280",
        subcategories: &["Refunds", "Reimbursements", "Miscellaneous"],
    },
];

/// Look up a category (expense or income) by id
pub fn find(id: &str) -> Option<&'static Category> {
    EXPENSE_CATEGORIES
        .iter()
        .chain(INCOME_CATEGORIES.iter())
        .find(|c| c.id == id)
}

/// Display name for a category id, falling back to the id itself
pub fn display_name(id: &str) -> &str {
    find(id).map(|c| c.name).unwrap_or(id)
}

pub fn is_expense_category(id: &str) -> bool {
    EXPENSE_CATEGORIES.iter().any(|c| c.id == id)
}
