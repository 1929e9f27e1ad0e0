use bytestream::{ByteReader, ByteWriter};
use codec::{CodecConfig, PatchLedger, ReadSession, WidePool, WriteSession};
use proptest::prelude::*;

fn words() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-c]{0,3}", 0..24)
}

proptest! {
    #[test]
    fn prop_equal_values_share_offsets(values in words()) {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut pool = WidePool::default();
        let refs: Vec<_> = values.iter().map(|v| pool.add(v)).collect();
        pool.flush(&mut writer).unwrap();

        let offsets: Vec<u64> = refs.iter().map(|r| pool.resolved(*r).unwrap()).collect();
        for i in 0..values.len() {
            for j in 0..values.len() {
                prop_assert_eq!(values[i] == values[j], offsets[i] == offsets[j]);
            }
        }
    }

    #[test]
    fn prop_second_flush_does_not_grow(values in words()) {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut pool = WidePool::default();
        for value in &values {
            pool.add(value);
        }
        pool.flush(&mut writer).unwrap();
        let len = writer.len();
        for value in &values {
            pool.add(value);
        }
        prop_assert_eq!(pool.flush(&mut writer).unwrap(), 0);
        prop_assert_eq!(writer.len(), len);
    }

    #[test]
    fn prop_references_read_back(values in words()) {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut session = WriteSession::new(CodecConfig::for_testing());
        for value in &values {
            session.wide_ref(&mut writer, value);
        }
        session.flush_wide(&mut writer).unwrap();
        let report = session.finish().unwrap();
        prop_assert_eq!(report.sites_allocated, values.len());
        prop_assert_eq!(report.sites_resolved, values.len());

        let mut reader = ByteReader::new(&buf);
        let mut session = ReadSession::new(CodecConfig::for_testing());
        for value in &values {
            prop_assert_eq!(&session.read_wstring_ref(&mut reader).unwrap(), value);
        }
    }

    #[test]
    fn prop_table_patch_completeness(order in Just((0..16usize).collect::<Vec<_>>()).prop_shuffle()) {
        let mut buf = Vec::new();
        let mut writer = ByteWriter::new(&mut buf);
        let mut ledger = PatchLedger::new();
        let table = ledger.reserve_table(&mut writer, order.len());
        for &index in &order {
            let site = table.slot(index).unwrap();
            writer.write(index as u32);
            ledger.resolve(&mut writer, site, index as u64 * 3).unwrap();
        }
        let stats = ledger.finish(true).unwrap();
        prop_assert_eq!(stats.allocated, order.len());
        prop_assert_eq!(stats.resolved, order.len());
        prop_assert_eq!(stats.zeroed, 0);

        for (index, slot) in buf[..order.len() * 8].chunks_exact(8).enumerate() {
            prop_assert_eq!(u64::from_le_bytes(slot.try_into().unwrap()), index as u64 * 3);
        }
    }
}
