//! Event order as seen by the application thread

use std::sync::Arc;
use std::time::Duration;

use interact_core::SessionState;
use interact_test::*;
use parking_lot::Mutex;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_inputs_dispatched_in_arrival_order(presses in prop::collection::vec(any::<bool>(), 1..24)) {
        let harness = Harness::new().unwrap();
        harness.connect(true).unwrap();
        prop_assert!(harness.pump_until_state(SessionState::Ready, Duration::from_secs(5)));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        harness.session.on_input(move |_, input| {
            sink.lock().push(input.transaction.as_ref().map(|t| t.as_str().to_string()))
        });

        for (i, pressed) in presses.iter().enumerate() {
            let tx = format!("tx{i}");
            harness.socket.deliver(button_input("p1", "fire", *pressed, Some(&tx)));
        }
        prop_assert!(harness.pump_until(Duration::from_secs(5), |_| seen.lock().len() == presses.len()));

        let expected: Vec<Option<String>> = (0..presses.len()).map(|i| Some(format!("tx{i}"))).collect();
        prop_assert_eq!(seen.lock().clone(), expected);
    }
}
