#![no_main]
use arbitrary::Arbitrary;
use bytes::{Buf, BufMut, Bytes};
use libfuzzer_sys::fuzz_target;
use membuf_store::{ByteArray, Config, Error, MemorySink, Sink};
use std::io::{Read, Seek, SeekFrom, Write};

/// Keeps the bounded sink small enough that its limit is actually hit.
const SINK_LIMIT: u64 = 4_096;

#[derive(Arbitrary, Debug)]
enum Operation {
    Push(u8),
    Extend(Vec<u8>),
    WriteRange { data: Vec<u8>, offset: u16, len: u16 },
    AppendBuf(Vec<u8>, Vec<u8>),
    ReadFrom(Vec<u8>),
    PutU64(u64),
    Fill { byte: u8, len: u16 },
    Get(u64),
    Set(u64, u8),
    Clear,
    Read { skip: u16, len: u16 },
    Seek(u64),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    initial_capacity: u8,
    operations: Vec<Operation>,
}

/// Every store alongside a plain vector modeling its contents.
struct Stores {
    sink: Sink,
    bounded: Vec<u8>,
    memory: MemorySink,
    appended: Vec<u8>,
    array: ByteArray,
    model: Vec<u8>,
}

impl Stores {
    fn new(initial_capacity: usize) -> Self {
        let cfg = Config {
            initial_capacity,
            max_contiguous: SINK_LIMIT,
        };
        Self {
            sink: Sink::new(cfg).unwrap(),
            bounded: Vec::new(),
            memory: MemorySink::with_capacity(initial_capacity).unwrap(),
            appended: Vec::new(),
            array: ByteArray::with_capacity(initial_capacity).unwrap(),
            model: Vec::new(),
        }
    }

    /// Appends to the bounded sink, which must accept all of `bytes` or none of them.
    fn append_bounded(&mut self, bytes: &[u8]) {
        match self.sink.extend_from_slice(bytes) {
            Ok(()) => self.bounded.extend_from_slice(bytes),
            Err(Error::CapacityExceeded(needed, max)) => {
                assert_eq!(max, SINK_LIMIT);
                assert_eq!(needed, (self.bounded.len() + bytes.len()) as u64);
                assert!(needed > SINK_LIMIT);
            }
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        self.append_bounded(bytes);
        self.memory.extend_from_slice(bytes);
        self.appended.extend_from_slice(bytes);
        self.array.write_all(bytes).unwrap();
        self.model.extend_from_slice(bytes);
    }

    fn check_lengths(&self) {
        assert_eq!(self.sink.len(), self.bounded.len() as u64);
        assert!(self.sink.len() <= SINK_LIMIT);
        assert_eq!(self.memory.len(), self.appended.len() as u64);
        assert_eq!(self.array.len(), self.model.len() as u64);
    }

    fn check_contents(&self) {
        assert_eq!(self.sink.to_vec(), self.bounded);
        assert_eq!(self.memory.to_vec().unwrap(), self.appended);
        assert_eq!(self.array.to_vec().unwrap(), self.model);

        let mut streamed = Vec::new();
        self.memory.write_to(&mut streamed).unwrap();
        assert_eq!(streamed, self.appended);

        let mut total = 0;
        for chunk in self.array.segments().chunks() {
            assert!(!chunk.is_empty());
            total += chunk.len();
        }
        assert_eq!(total, self.model.len());
    }
}

fn fuzz(input: FuzzInput) {
    if input.operations.len() > 128 {
        return;
    }
    let mut stores = Stores::new(input.initial_capacity as usize);

    for op in input.operations {
        match op {
            Operation::Push(byte) => stores.append(&[byte]),
            Operation::Extend(data) => stores.append(&data),
            Operation::WriteRange { data, offset, len } => {
                let (offset, len) = (offset as usize, len as usize);
                let valid = offset
                    .checked_add(len)
                    .is_some_and(|end| end <= data.len());
                if valid {
                    stores.memory.write_range(&data, offset, len).unwrap();
                    stores.appended.extend_from_slice(&data[offset..offset + len]);
                    stores.array.write_range(&data, offset, len).unwrap();
                    stores.model.extend_from_slice(&data[offset..offset + len]);
                    stores.append_bounded(&data[offset..offset + len]);
                } else {
                    assert!(matches!(
                        stores.memory.write_range(&data, offset, len),
                        Err(Error::InvalidRange(..))
                    ));
                    assert!(matches!(
                        stores.array.write_range(&data, offset, len),
                        Err(Error::InvalidRange(..))
                    ));
                    assert!(matches!(
                        stores.sink.write_range(&data, offset, len),
                        Err(Error::InvalidRange(..))
                    ));
                }
            }
            Operation::AppendBuf(head, tail) => {
                let mut joined = head.clone();
                joined.extend_from_slice(&tail);
                stores
                    .memory
                    .append_buf(Bytes::from(head.clone()).chain(Bytes::from(tail.clone())));
                stores.appended.extend_from_slice(&joined);
                stores
                    .array
                    .append_buf(Bytes::from(head).chain(Bytes::from(tail)));
                stores.model.extend_from_slice(&joined);
                stores.append_bounded(&joined);
            }
            Operation::ReadFrom(data) => {
                let read = stores.memory.read_from(&mut &data[..]).unwrap();
                assert_eq!(read, data.len() as u64);
                stores.appended.extend_from_slice(&data);
                let read = stores.array.read_from(&mut &data[..]).unwrap();
                assert_eq!(read, data.len() as u64);
                stores.model.extend_from_slice(&data);
                stores.append_bounded(&data);
            }
            Operation::PutU64(value) => {
                stores.memory.put_u64(value);
                stores.appended.put_u64(value);
                stores.array.put_u64(value);
                stores.model.put_u64(value);
                stores.append_bounded(&value.to_be_bytes());
            }
            Operation::Fill { byte, len } => {
                let len = len as usize % 1_024;
                stores.memory.put_bytes(byte, len);
                stores.appended.put_bytes(byte, len);
                stores.array.put_bytes(byte, len);
                stores.model.put_bytes(byte, len);
                stores.append_bounded(&vec![byte; len]);
            }
            Operation::Get(index) => {
                if index < stores.model.len() as u64 {
                    assert_eq!(stores.array.get(index).unwrap(), stores.model[index as usize]);
                } else {
                    assert!(matches!(
                        stores.array.get(index),
                        Err(Error::OutOfBounds(..))
                    ));
                }
            }
            Operation::Set(index, value) => {
                if index < stores.model.len() as u64 {
                    let previous = stores.array.set(index, value).unwrap();
                    assert_eq!(previous, stores.model[index as usize]);
                    stores.model[index as usize] = value;
                } else {
                    assert!(matches!(
                        stores.array.set(index, value),
                        Err(Error::OutOfBounds(..))
                    ));
                }
            }
            Operation::Clear => {
                stores.sink.clear();
                stores.bounded.clear();
                stores.memory.clear();
                stores.appended.clear();
                stores.array.clear();
                stores.model.clear();
            }
            Operation::Read { skip, len } => {
                let model = &stores.model;
                let mut reader = stores.array.reader();
                let skipped = reader.skip(skip as u64);
                assert_eq!(skipped, (skip as u64).min(model.len() as u64));

                let mut out = vec![0; len as usize];
                let mut filled = 0;
                while filled < out.len() {
                    let n = reader.read(&mut out[filled..]).unwrap();
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                let start = skipped as usize;
                let end = (start + len as usize).min(model.len());
                assert_eq!(&out[..filled], &model[start..end]);
                assert_eq!(reader.remaining(), model.len() - end);
            }
            Operation::Seek(position) => {
                let appended = &stores.appended;
                let mut reader = stores.memory.reader();
                reader.skip(appended.len() as u64);
                let landed = reader.seek(SeekFrom::Start(position)).unwrap();
                assert_eq!(landed, position.min(appended.len() as u64));
                assert_eq!(reader.position(), landed);
                assert_eq!(reader.read_byte(), appended.get(landed as usize).copied());
            }
        }
        stores.check_lengths();
    }

    stores.check_contents();
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
