//! Property coverage for the stock decrement: regardless of starting
//! quantity and requested amount, the stored quantity never goes
//! negative and never drops by more than the request.

mod common;

use proptest::prelude::*;

use common::{client, seed_item, services};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decrement_never_goes_negative(start in 0i64..10_000, amount in 1i64..10_000) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let (store, services) = services();
            seed_item(&store, "BIO-PPE-0001", "Nitrile Gloves", start);

            let (old, new) = services
                .inventory
                .decrement("BIO-PPE-0001", amount, None, &client(), None)
                .await
                .unwrap();

            prop_assert_eq!(old, start);
            prop_assert!(new >= 0);
            prop_assert!(old - new <= amount);
            prop_assert_eq!(new, (start - amount).max(0));

            let item = services
                .inventory
                .get("BIO-PPE-0001")
                .await
                .unwrap()
                .unwrap();
            prop_assert_eq!(item.quantity, new);
            Ok(())
        })?;
    }
}
