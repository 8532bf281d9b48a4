// Models module - Database entity representations

pub mod ad;
pub mod boosted_ad;
pub mod category;
pub mod favorite;
pub mod promotion;
pub mod site_settings;
pub mod user;

pub use ad::Ad;
pub use boosted_ad::{BoostedAd, PaymentStatus};
pub use category::Category;
pub use favorite::Favorite;
pub use promotion::BoostPromotion;
pub use site_settings::SiteSettings;
pub use user::User;
