//! Property test: the codec round-trips every valid command.

use proptest::prelude::*;
use std::io::Cursor;

use stepline_common::{AXIS_COUNT, AxisCommand, ContentKind, GlobalEnable, MotionCommand};
use stepline_wire::{read_message, write_message};

fn arb_content_kind() -> impl Strategy<Value = ContentKind> {
    prop_oneof![
        Just(ContentKind::NoData),
        Just(ContentKind::RemoteConnect),
        Just(ContentKind::RemoteDisconnect),
        Just(ContentKind::UserData),
    ]
}

fn arb_global_enable() -> impl Strategy<Value = GlobalEnable> {
    prop_oneof![
        Just(GlobalEnable::Disabled),
        Just(GlobalEnable::Enabled),
        Just(GlobalEnable::Shutdown),
    ]
}

fn arb_axis() -> impl Strategy<Value = AxisCommand> {
    (any::<bool>(), any::<bool>(), any::<u32>()).prop_map(|(enabled, direction, period)| {
        AxisCommand {
            enabled,
            direction,
            period,
        }
    })
}

fn arb_command() -> impl Strategy<Value = MotionCommand> {
    (
        arb_content_kind(),
        // Labels stay under the wire cap; content is arbitrary UTF-8.
        "\\PC{0,200}",
        arb_global_enable(),
        prop::array::uniform6(arb_axis()),
    )
        .prop_map(|(content_kind, label, all_axes_enable, axes)| MotionCommand {
            content_kind,
            label,
            all_axes_enable,
            axes,
        })
}

proptest! {
    #[test]
    fn decode_encode_identity(cmd in arb_command()) {
        let mut buf = Vec::new();
        write_message(&mut buf, &cmd).unwrap();
        let decoded = read_message(&mut Cursor::new(buf)).unwrap();
        prop_assert_eq!(decoded, cmd);
    }

    #[test]
    fn frames_concatenate(cmds in prop::collection::vec(arb_command(), 1..8)) {
        let mut stream = Vec::new();
        for cmd in &cmds {
            write_message(&mut stream, cmd).unwrap();
        }
        let mut cursor = Cursor::new(stream);
        for cmd in &cmds {
            prop_assert_eq!(&read_message(&mut cursor).unwrap(), cmd);
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        // Decoding hostile input may fail, but must fail as an error.
        let _ = stepline_wire::decode(&bytes);
        let _ = read_message(&mut Cursor::new(bytes));
    }
}

#[test]
fn axis_count_matches_wire_layout() {
    // The fixed 20-word payload depends on exactly six axes.
    assert_eq!(AXIS_COUNT, 6);
}
