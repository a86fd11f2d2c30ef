use super::models::{
    AdvertisingService, DesignService, ManagementService, Subscription, Tier, WebsiteService,
};

/// 利用しているサービス区分の数から区分を決める
///
/// 4区分で gold、3区分で silver、2区分で bronze、それ以外は regular。
/// どの区分かは問わず、件数ではなく区分の数だけを見る。
pub fn classify(
    website: &[WebsiteService],
    design: &[DesignService],
    management: &[ManagementService],
    advertising: &[AdvertisingService],
) -> Tier {
    let populated = [
        !website.is_empty(),
        !design.is_empty(),
        !management.is_empty(),
        !advertising.is_empty(),
    ]
    .into_iter()
    .filter(|populated| *populated)
    .count();

    tier_for_category_count(populated)
}

/// 区分の数から区分を得る
pub fn tier_for_category_count(count: usize) -> Tier {
    match count {
        4 => Tier::Gold,
        3 => Tier::Silver,
        2 => Tier::Bronze,
        _ => Tier::Regular,
    }
}

/// 購読のサービス構成から区分を求める
pub fn classify_subscription(subscription: &Subscription) -> Tier {
    classify(
        &subscription.website_services,
        &subscription.design_services,
        &subscription.management_services,
        &subscription.advertising_services,
    )
}
