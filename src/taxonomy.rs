//! Canonical category taxonomy and known-merchant table
//!
//! The taxonomy is the fixed category → subcategory mapping that defines all
//! valid classification outputs. Order matters: `first_subcategory` is the
//! repair target when the LLM invents a subcategory.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Fallback pair when nothing else can be said about a transaction.
pub const FALLBACK_CATEGORY: &str = "Other";
pub const FALLBACK_SUBCATEGORY: &str = "Miscellaneous";

/// Standardized category taxonomy.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Food & Dining",
        &["Groceries", "Restaurants", "Cafe/Coffee", "Fast Food", "Alcohol/Bars", "Food Delivery"],
    ),
    (
        "Transportation",
        &["Fuel", "Public Transit", "Ride Share", "Taxi", "Parking", "Vehicle Maintenance", "Tolls"],
    ),
    (
        "Shopping",
        &["Clothing", "Electronics", "Home & Garden", "Online Shopping", "General Merchandise"],
    ),
    (
        "Bills & Utilities",
        &["Electricity", "Water", "Gas", "Internet", "Phone", "Rent/Mortgage", "Insurance"],
    ),
    (
        "Entertainment",
        &["Movies", "Streaming", "Games", "Events", "Hobbies", "Sports"],
    ),
    (
        "Healthcare",
        &["Doctor", "Pharmacy", "Hospital", "Dental", "Vision", "Mental Health"],
    ),
    (
        "Education",
        &["Tuition", "Books", "Courses", "Supplies", "Training"],
    ),
    (
        "Travel",
        &["Hotels", "Flights", "Tours", "Travel Insurance", "Car Rental"],
    ),
    (
        "Personal Care",
        &["Salon", "Spa", "Gym", "Beauty Products", "Grooming"],
    ),
    (
        "Business",
        &["Office Supplies", "Professional Services", "Business Travel", "Client Entertainment", "Software/Tools", "Coworking"],
    ),
    (
        "Investments",
        &["Stocks", "Mutual Funds", "Fixed Deposits", "Crypto", "Gold"],
    ),
    (
        "Gifts & Donations",
        &["Gifts", "Charity", "Donations", "Tips"],
    ),
    ("Other", &["Miscellaneous", "Uncategorized"]),
];

/// Known merchants, exact match on the normalized vendor string only.
/// Descriptions and notes go through LLM classification instead.
const KNOWN_MERCHANT_TABLE: &[(&str, (&str, &str))] = &[
    // Food & Dining: Cafe/Coffee
    ("starbucks", ("Food & Dining", "Cafe/Coffee")),
    ("cafe coffee day", ("Food & Dining", "Cafe/Coffee")),
    ("ccd", ("Food & Dining", "Cafe/Coffee")),
    ("dunkin", ("Food & Dining", "Cafe/Coffee")),
    ("costa coffee", ("Food & Dining", "Cafe/Coffee")),
    ("blue tokai", ("Food & Dining", "Cafe/Coffee")),
    ("third wave", ("Food & Dining", "Cafe/Coffee")),
    ("tim hortons", ("Food & Dining", "Cafe/Coffee")),
    // Food & Dining: Fast Food
    ("mcdonalds", ("Food & Dining", "Fast Food")),
    ("mcdonald's", ("Food & Dining", "Fast Food")),
    ("burger king", ("Food & Dining", "Fast Food")),
    ("kfc", ("Food & Dining", "Fast Food")),
    ("dominos", ("Food & Dining", "Fast Food")),
    ("domino's", ("Food & Dining", "Fast Food")),
    ("pizza hut", ("Food & Dining", "Fast Food")),
    ("subway", ("Food & Dining", "Fast Food")),
    ("taco bell", ("Food & Dining", "Fast Food")),
    ("wendy's", ("Food & Dining", "Fast Food")),
    // Food & Dining: Food Delivery
    ("zomato", ("Food & Dining", "Food Delivery")),
    ("swiggy", ("Food & Dining", "Food Delivery")),
    ("uber eats", ("Food & Dining", "Food Delivery")),
    ("ubereats", ("Food & Dining", "Food Delivery")),
    ("doordash", ("Food & Dining", "Food Delivery")),
    ("grubhub", ("Food & Dining", "Food Delivery")),
    ("deliveroo", ("Food & Dining", "Food Delivery")),
    // Food & Dining: Groceries
    ("dmart", ("Food & Dining", "Groceries")),
    ("bigbasket", ("Food & Dining", "Groceries")),
    ("blinkit", ("Food & Dining", "Groceries")),
    ("instamart", ("Food & Dining", "Groceries")),
    ("zepto", ("Food & Dining", "Groceries")),
    ("walmart", ("Food & Dining", "Groceries")),
    ("whole foods", ("Food & Dining", "Groceries")),
    ("kroger", ("Food & Dining", "Groceries")),
    ("costco", ("Food & Dining", "Groceries")),
    ("trader joe's", ("Food & Dining", "Groceries")),
    ("aldi", ("Food & Dining", "Groceries")),
    ("reliance fresh", ("Food & Dining", "Groceries")),
    // Transportation: Ride Share
    ("uber", ("Transportation", "Ride Share")),
    ("ola", ("Transportation", "Ride Share")),
    ("lyft", ("Transportation", "Ride Share")),
    ("rapido", ("Transportation", "Ride Share")),
    ("bolt", ("Transportation", "Ride Share")),
    // Transportation: Fuel
    ("shell", ("Transportation", "Fuel")),
    ("indian oil", ("Transportation", "Fuel")),
    ("bharat petroleum", ("Transportation", "Fuel")),
    ("hpcl", ("Transportation", "Fuel")),
    ("chevron", ("Transportation", "Fuel")),
    ("exxon", ("Transportation", "Fuel")),
    // Transportation: Public Transit
    ("irctc", ("Transportation", "Public Transit")),
    ("indian railways", ("Transportation", "Public Transit")),
    ("dmrc", ("Transportation", "Public Transit")),
    ("mta", ("Transportation", "Public Transit")),
    ("amtrak", ("Transportation", "Public Transit")),
    // Shopping
    ("amazon", ("Shopping", "Online Shopping")),
    ("flipkart", ("Shopping", "Online Shopping")),
    ("myntra", ("Shopping", "Online Shopping")),
    ("ebay", ("Shopping", "Online Shopping")),
    ("etsy", ("Shopping", "Online Shopping")),
    ("nike", ("Shopping", "Clothing")),
    ("adidas", ("Shopping", "Clothing")),
    ("zara", ("Shopping", "Clothing")),
    ("h&m", ("Shopping", "Clothing")),
    ("uniqlo", ("Shopping", "Clothing")),
    ("apple store", ("Shopping", "Electronics")),
    ("best buy", ("Shopping", "Electronics")),
    ("croma", ("Shopping", "Electronics")),
    ("reliance digital", ("Shopping", "Electronics")),
    // Bills & Utilities
    ("bescom", ("Bills & Utilities", "Electricity")),
    ("tata power", ("Bills & Utilities", "Electricity")),
    ("jio fiber", ("Bills & Utilities", "Internet")),
    ("airtel fiber", ("Bills & Utilities", "Internet")),
    ("jio", ("Bills & Utilities", "Phone")),
    ("airtel", ("Bills & Utilities", "Phone")),
    ("verizon", ("Bills & Utilities", "Phone")),
    ("at&t", ("Bills & Utilities", "Phone")),
    ("t-mobile", ("Bills & Utilities", "Phone")),
    // Entertainment
    ("netflix", ("Entertainment", "Streaming")),
    ("prime video", ("Entertainment", "Streaming")),
    ("hotstar", ("Entertainment", "Streaming")),
    ("disney+", ("Entertainment", "Streaming")),
    ("spotify", ("Entertainment", "Streaming")),
    ("youtube premium", ("Entertainment", "Streaming")),
    ("pvr", ("Entertainment", "Movies")),
    ("inox", ("Entertainment", "Movies")),
    ("amc", ("Entertainment", "Movies")),
    ("bookmyshow", ("Entertainment", "Movies")),
    ("steam", ("Entertainment", "Games")),
    ("playstation", ("Entertainment", "Games")),
    ("xbox", ("Entertainment", "Games")),
    ("nintendo", ("Entertainment", "Games")),
    // Healthcare
    ("apollo pharmacy", ("Healthcare", "Pharmacy")),
    ("cvs", ("Healthcare", "Pharmacy")),
    ("walgreens", ("Healthcare", "Pharmacy")),
    ("pharmeasy", ("Healthcare", "Pharmacy")),
    ("1mg", ("Healthcare", "Pharmacy")),
    ("fortis", ("Healthcare", "Hospital")),
    ("max hospital", ("Healthcare", "Hospital")),
    // Personal Care
    ("planet fitness", ("Personal Care", "Gym")),
    ("cult.fit", ("Personal Care", "Gym")),
    ("anytime fitness", ("Personal Care", "Gym")),
    // Travel
    ("makemytrip", ("Travel", "Flights")),
    ("cleartrip", ("Travel", "Flights")),
    ("expedia", ("Travel", "Flights")),
    ("booking.com", ("Travel", "Hotels")),
    ("airbnb", ("Travel", "Hotels")),
    ("oyo", ("Travel", "Hotels")),
    ("marriott", ("Travel", "Hotels")),
    ("hilton", ("Travel", "Hotels")),
    // Business
    ("wework", ("Business", "Coworking")),
    ("regus", ("Business", "Coworking")),
    ("staples", ("Business", "Office Supplies")),
    ("office depot", ("Business", "Office Supplies")),
];

lazy_static! {
    static ref KNOWN_MERCHANTS: HashMap<&'static str, (&'static str, &'static str)> =
        KNOWN_MERCHANT_TABLE.iter().copied().collect();
    static ref CATEGORY_INDEX: HashMap<&'static str, &'static [&'static str]> =
        CATEGORIES.iter().copied().collect();
}

/// Normalize a vendor name for table and cache lookups.
pub fn normalize_vendor(vendor: &str) -> String {
    vendor
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Exact known-merchant lookup on a normalized vendor string.
pub fn known_merchant(vendor: &str) -> Option<(&'static str, &'static str)> {
    KNOWN_MERCHANTS.get(normalize_vendor(vendor).as_str()).copied()
}

/// Iterator over the known-merchant table (used by tests and prompts).
pub fn known_merchants() -> impl Iterator<Item = (&'static str, (&'static str, &'static str))> {
    KNOWN_MERCHANT_TABLE.iter().copied()
}

pub fn is_known_category(category: &str) -> bool {
    CATEGORY_INDEX.contains_key(category)
}

pub fn subcategories_of(category: &str) -> Option<&'static [&'static str]> {
    CATEGORY_INDEX.get(category).copied()
}

/// First subcategory of a category, the repair target for invented
/// subcategories.
pub fn first_subcategory(category: &str) -> Option<&'static str> {
    subcategories_of(category).and_then(|subs| subs.first().copied())
}

/// True when (category, subcategory) is a canonical pair.
pub fn is_valid_pair(category: &str, subcategory: &str) -> bool {
    subcategories_of(category)
        .map(|subs| subs.contains(&subcategory))
        .unwrap_or(false)
}

/// Parent category of a subcategory, if the subcategory is canonical.
pub fn category_for_subcategory(subcategory: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(_, subs)| subs.contains(&subcategory))
        .map(|(cat, _)| *cat)
}

/// Render the taxonomy as a prompt block: `- Category: Sub1, Sub2, ...`
pub fn prompt_block() -> String {
    CATEGORIES
        .iter()
        .map(|(cat, subs)| format!("- {}: {}", cat, subs.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
