pub mod category;
pub mod ip_security;

pub use category::{
    BUILT_IN_CATEGORIES, BuiltInCategory, Category, CategoryKind, CategoryPatch, CategoryRecord,
    CategoryTarget, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON, EffectiveCategories,
};
pub use ip_security::{IpChange, IpCheckOutcome, IpSecurityRecord, IpWarning, MAX_IP_HISTORY};
