//! The npy array container.
//!
//! An [`Array`] owns a flat byte buffer of `elements × stride` bytes, a
//! [`Shape`], a record layout [`Descr`], and a memory [`Order`]. Records are
//! accessed through borrowed [`Record`] and [`RecordMut`] views, which gate
//! reinterpretation of raw bytes as typed values behind the layout's
//! declared element types.

pub mod iter;
use iter::{Records, RecordsMut};

pub mod npy;

use std::io;

use crate::{
    bytes::{self, Endian},
    descr::Descr,
    dtype::{Dtype, Scalar},
    error::Error,
    shape::{Order, Shape},
};

/// An N-dimensional array of records over a flat byte buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Array {
    data: Vec<u8>,
    shape: Shape,
    descr: Descr,
    order: Order,
}

impl Array {
    /// Creates an array with the given layout, shape, and order, with all
    /// record bytes zeroed.
    pub fn new<S>(descr: Descr, shape: S, order: Order) -> Self
    where
        S: Into<Shape>,
    {
        let mut array = Self {
            data: Vec::new(),
            shape: shape.into(),
            descr,
            order,
        };
        array.data = vec![0; array.data_size()];
        array
    }

    /// Creates an unstructured row-major array from a slice of scalars.
    ///
    /// The layout is a single native-endian field of `T`. Fails with a
    /// bounds error if the value count does not match the shape.
    pub fn from_scalars<T, S>(values: &[T], shape: S) -> Result<Self, Error>
    where
        T: Scalar,
        S: Into<Shape>,
    {
        let mut descr = Descr::new();
        descr.push(Dtype::of::<T>(Endian::NATIVE), "")?;

        let mut array = Self::new(descr, shape, Order::RowMajor);

        if values.len() != array.elements() {
            return Err(Error::Bounds(format!(
                "got {} values for shape {} with {} elements",
                values.len(),
                array.shape,
                array.elements()
            )));
        }

        for (record, value) in array.records_mut().zip(values) {
            record.into_set(*value)?;
        }

        Ok(array)
    }

    /// Whether the array holds no record bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of records in the array.
    ///
    /// This is `d0 × d1 × … × dn`, or 0 if the array has no dimensions or
    /// its layout has no fields.
    pub fn elements(&self) -> usize {
        if self.descr.stride() == 0 {
            0
        } else {
            self.shape.elements()
        }
    }

    /// The number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.shape.rank()
    }

    /// The extent of the given dimension.
    pub fn extent(&self, dimension: usize) -> Result<usize, Error> {
        self.shape.get(dimension).copied().ok_or_else(|| {
            Error::Bounds(format!(
                "dimension {dimension} out of range for {}-dimensional array",
                self.dimensions()
            ))
        })
    }

    /// The dimension extents.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The record layout.
    pub fn descr(&self) -> &Descr {
        &self.descr
    }

    /// The memory order.
    pub fn order(&self) -> Order {
        self.order
    }

    /// The type of the first field of the layout.
    ///
    /// This is the element type of an unstructured array.
    pub fn dtype(&self) -> Result<&Dtype, Error> {
        if self.descr.is_empty() {
            return Err(Error::Bounds("descriptor has no fields".to_string()));
        }

        self.descr.field(0).map(|(_, dtype)| dtype)
    }

    /// The type of the named field of the layout.
    pub fn field_dtype(&self, name: &str) -> Result<&Dtype, Error> {
        self.descr.dtype(name)
    }

    /// The raw record buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The byte size of the record buffer: `elements × stride`.
    pub fn data_size(&self) -> usize {
        self.elements() * self.descr.stride()
    }

    /// The linear record index of the given coordinates.
    pub fn linear_index(&self, coords: &[usize]) -> Result<usize, Error> {
        self.shape.linear_index(coords, self.order)
    }

    /// A view of the record at the given linear index.
    pub fn record(&self, index: usize) -> Result<Record<'_>, Error> {
        if index >= self.elements() {
            return Err(Error::Bounds(format!(
                "record index {index} out of range for {} elements",
                self.elements()
            )));
        }

        Ok(Record::new(self, index))
    }

    /// A mutable view of the record at the given linear index.
    pub fn record_mut(&mut self, index: usize) -> Result<RecordMut<'_>, Error> {
        if index >= self.elements() {
            return Err(Error::Bounds(format!(
                "record index {index} out of range for {} elements",
                self.elements()
            )));
        }

        let stride = self.descr.stride();
        let data = &mut self.data[index * stride..(index + 1) * stride];

        Ok(RecordMut::new(&self.descr, data, index))
    }

    /// A view of the record at the given coordinates.
    pub fn record_at<I>(&self, coords: I) -> Result<Record<'_>, Error>
    where
        I: AsRef<[usize]>,
    {
        let index = self.linear_index(coords.as_ref())?;
        self.record(index)
    }

    /// A mutable view of the record at the given coordinates.
    pub fn record_at_mut<I>(&mut self, coords: I) -> Result<RecordMut<'_>, Error>
    where
        I: AsRef<[usize]>,
    {
        let index = self.linear_index(coords.as_ref())?;
        self.record_mut(index)
    }

    /// Iterates over the records of the array.
    pub fn records(&self) -> Records<'_> {
        Records::new(self)
    }

    /// Iterates over the records of the array with write access.
    pub fn records_mut(&mut self) -> RecordsMut<'_> {
        RecordsMut::new(&self.descr, &mut self.data)
    }

    /// The textual header dict describing this array.
    pub fn header(&self) -> String {
        format!(
            "{{'descr': {}, 'fortran_order': {}, 'shape': {}}}",
            self.descr,
            if self.order.is_fortran() {
                "True"
            } else {
                "False"
            },
            self.shape
        )
    }

    /// Byte-swaps every field of every record whose byte order differs from
    /// `target`, then records the new byte order in the layout.
    ///
    /// The layout and the buffer never disagree: after this call every field
    /// reports `target` as its byte order.
    pub fn convert_to(&mut self, target: Endian) {
        let stride = self.descr.stride();

        if stride > 0 {
            let descr = &self.descr;

            for record in self.data.chunks_exact_mut(stride) {
                for (_, dtype) in descr.iter() {
                    if dtype.endian() != target {
                        let offset = dtype.offset();
                        bytes::swap_bytes(&mut record[offset..offset + dtype.size()]);
                    }
                }
            }
        }

        for dtype in self.descr.dtypes_mut() {
            dtype.set_endian(target);
        }
    }

    /// Reads an array in npy format from a reader.
    ///
    /// The stream is assumed to be positioned at the start; all bytes
    /// remaining after the header are taken as the record buffer.
    pub fn read_npy<R>(mut reader: R) -> Result<Self, Error>
    where
        R: io::Read,
    {
        npy::read_array(&mut reader)
    }

    /// Writes the array in npy format to a writer.
    pub fn write_npy<W>(&self, mut writer: W) -> Result<(), Error>
    where
        W: io::Write,
    {
        npy::write_array(&mut writer, self)
    }

    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }
}

/// A read-only view of one record.
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    array: &'a Array,
    index: usize,
}

impl<'a> Record<'a> {
    pub(crate) fn new(array: &'a Array, index: usize) -> Self {
        Self { array, index }
    }

    /// The linear index of this record within its array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw bytes of the whole record.
    pub fn bytes(&self) -> &'a [u8] {
        let stride = self.array.descr.stride();
        &self.array.data[self.index * stride..(self.index + 1) * stride]
    }

    /// The raw bytes of the named field.
    pub fn field_bytes(&self, name: &str) -> Result<&'a [u8], Error> {
        let dtype = self.array.descr.dtype(name)?;
        Ok(&self.bytes()[dtype.offset()..dtype.offset() + dtype.size()])
    }

    /// The value of the first field, reinterpreted as `T`.
    ///
    /// Fails with a type error if `T` does not match the field's declared
    /// element type.
    pub fn get<T>(&self) -> Result<T, Error>
    where
        T: Scalar,
    {
        if self.array.descr.is_empty() {
            return Err(Error::Bounds("descriptor has no fields".to_string()));
        }

        let (name, dtype) = self.array.descr.field(0)?;
        read_field(dtype, name, self.bytes())
    }

    /// The value of the named field, reinterpreted as `T`.
    ///
    /// Fails with a type error if `T` does not match the field's declared
    /// element type.
    pub fn get_field<T>(&self, name: &str) -> Result<T, Error>
    where
        T: Scalar,
    {
        let dtype = self.array.descr.dtype(name)?;
        read_field(dtype, name, self.bytes())
    }

    /// The number of records between this view and `other`.
    ///
    /// Fails with a bounds error if the views come from different arrays,
    /// where the distance would be meaningless.
    pub fn distance(&self, other: &Record<'_>) -> Result<isize, Error> {
        if !std::ptr::eq(self.array, other.array) {
            return Err(Error::Bounds(
                "comparing records from different arrays".to_string(),
            ));
        }

        Ok(self.index as isize - other.index as isize)
    }
}

/// A mutable view of one record.
#[derive(Debug)]
pub struct RecordMut<'a> {
    descr: &'a Descr,
    data: &'a mut [u8],
    index: usize,
}

impl<'a> RecordMut<'a> {
    pub(crate) fn new(descr: &'a Descr, data: &'a mut [u8], index: usize) -> Self {
        Self { descr, data, index }
    }

    /// The linear index of this record within its array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw bytes of the whole record.
    pub fn bytes(&self) -> &[u8] {
        self.data
    }

    /// The raw mutable bytes of the whole record.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// The value of the first field, reinterpreted as `T`.
    pub fn get<T>(&self) -> Result<T, Error>
    where
        T: Scalar,
    {
        let (name, dtype) = self.first_field()?;
        read_field(dtype, name, self.data)
    }

    /// The value of the named field, reinterpreted as `T`.
    pub fn get_field<T>(&self, name: &str) -> Result<T, Error>
    where
        T: Scalar,
    {
        let dtype = self.descr.dtype(name)?;
        read_field(dtype, name, self.data)
    }

    /// Stores `value` into the first field.
    ///
    /// Fails with a type error if `T` does not match the field's declared
    /// element type.
    pub fn set<T>(&mut self, value: T) -> Result<(), Error>
    where
        T: Scalar,
    {
        let (name, dtype) = self.first_field()?;
        write_field(dtype, name, self.data, value)
    }

    /// Stores `value` into the named field.
    ///
    /// Fails with a type error if `T` does not match the field's declared
    /// element type.
    pub fn set_field<T>(&mut self, name: &str, value: T) -> Result<(), Error>
    where
        T: Scalar,
    {
        let dtype = self.descr.dtype(name)?;
        write_field(dtype, name, self.data, value)
    }

    /// Stores `value` into the first field, consuming the view.
    pub fn into_set<T>(mut self, value: T) -> Result<(), Error>
    where
        T: Scalar,
    {
        self.set(value)
    }

    fn first_field(&self) -> Result<(&'a str, &'a Dtype), Error> {
        if self.descr.is_empty() {
            return Err(Error::Bounds("descriptor has no fields".to_string()));
        }

        self.descr.field(0)
    }
}

fn read_field<T>(dtype: &Dtype, name: &str, record: &[u8]) -> Result<T, Error>
where
    T: Scalar,
{
    if !dtype.matches::<T>() {
        return Err(Error::Type(format!(
            "bad type cast for field '{name}' of type {dtype}"
        )));
    }

    let offset = dtype.offset();
    Ok(T::from_bytes(&record[offset..offset + dtype.size()]))
}

fn write_field<T>(dtype: &Dtype, name: &str, record: &mut [u8], value: T) -> Result<(), Error>
where
    T: Scalar,
{
    if !dtype.matches::<T>() {
        return Err(Error::Type(format!(
            "bad type cast for field '{name}' of type {dtype}"
        )));
    }

    let offset = dtype.offset();
    value.to_bytes(&mut record[offset..offset + dtype.size()]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_descr() -> Descr {
        let mut descr = Descr::new();
        descr.push(Dtype::of::<i64>(Endian::NATIVE), "id").unwrap();
        descr
            .push(Dtype::of::<f32>(Endian::NATIVE), "value")
            .unwrap();
        descr
    }

    #[test]
    fn test_default_is_empty() {
        let a = Array::default();

        assert!(a.is_empty());
        assert_eq!(a.dimensions(), 0);
        assert_eq!(a.elements(), 0);
        assert_eq!(a.data_size(), 0);
        assert!(a.extent(0).is_err());
        assert!(a.dtype().is_err());
        assert!(a.field_dtype("test").is_err());
        assert_eq!(a.order(), Order::RowMajor);
        assert!(a.data().is_empty());
    }

    #[test]
    fn test_new_zero_fills() {
        let a = Array::new(record_descr(), [3, 4, 5], Order::RowMajor);

        assert!(!a.is_empty());
        assert_eq!(a.elements(), 60);
        assert_eq!(a.dimensions(), 3);
        assert_eq!(a.extent(0).unwrap(), 3);
        assert_eq!(a.extent(1).unwrap(), 4);
        assert_eq!(a.extent(2).unwrap(), 5);
        assert!(a.extent(3).is_err());
        assert_eq!(a.data_size(), 60 * 12);
        assert!(a.data().iter().all(|&b| b == 0));

        assert_eq!(a.dtype().unwrap().size(), 8);
        assert_eq!(a.field_dtype("value").unwrap().offset(), 8);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut a = Array::from_scalars(&[1i32, 2, 3], [3]).unwrap();
        let b = a.clone();

        a.record_mut(0).unwrap().set(9i32).unwrap();

        assert_eq!(a.record(0).unwrap().get::<i32>().unwrap(), 9);
        assert_eq!(b.record(0).unwrap().get::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_fieldless_layout_has_no_elements() {
        let a = Array::new(Descr::new(), [3, 3], Order::RowMajor);

        assert_eq!(a.elements(), 0);
        assert_eq!(a.data_size(), 0);
        assert!(a.is_empty());
        assert_eq!(a.records().count(), 0);
    }

    #[test]
    fn test_record_access() {
        let mut a = Array::new(record_descr(), [2], Order::RowMajor);

        {
            let mut r = a.record_mut(0).unwrap();
            r.set_field("id", 17i64).unwrap();
            r.set_field("value", 0.5f32).unwrap();
        }

        let r = a.record(0).unwrap();
        assert_eq!(r.get::<i64>().unwrap(), 17);
        assert_eq!(r.get_field::<i64>("id").unwrap(), 17);
        assert_eq!(r.get_field::<f32>("value").unwrap(), 0.5);

        // get() on the whole record reads the first field.
        assert_eq!(r.get::<i64>().unwrap(), r.get_field::<i64>("id").unwrap());

        assert!(a.record(2).is_err());
        assert!(a.record_mut(2).is_err());
    }

    #[test]
    fn test_typed_access_is_checked() {
        let a = Array::from_scalars(&[1.0f32, 2.0], [2]).unwrap();
        let r = a.record(0).unwrap();

        assert!(r.get::<f32>().is_ok());
        assert!(matches!(r.get::<i32>(), Err(Error::Type(_))));
        assert!(matches!(r.get::<f64>(), Err(Error::Type(_))));
        assert!(matches!(
            r.get_field::<f32>("missing"),
            Err(Error::Bounds(_))
        ));
    }

    #[test]
    fn test_field_bytes() {
        let mut a = Array::new(record_descr(), [1], Order::RowMajor);
        a.record_mut(0).unwrap().set_field("id", -1i64).unwrap();

        let r = a.record(0).unwrap();
        assert_eq!(r.bytes().len(), 12);
        assert_eq!(r.field_bytes("id").unwrap(), &[0xff; 8]);
        assert_eq!(r.field_bytes("value").unwrap(), &[0; 4]);
        assert!(r.field_bytes("missing").is_err());
    }

    #[test]
    fn test_coordinate_access() {
        let mut c = Array::from_scalars(&[0i32; 27], [3, 3, 3]).unwrap();
        let mut a = c.clone();

        // Sequential fill.
        for (i, record) in a.records_mut().enumerate() {
            record.into_set(i as i32).unwrap();
        }

        // The same fill on a column-major array of the same shape.
        c = Array::new(c.descr().clone(), [3, 3, 3], Order::ColumnMajor);
        for (i, record) in c.records_mut().enumerate() {
            record.into_set(i as i32).unwrap();
        }

        // Row-major: the last coordinate varies fastest.
        let mut expected = 0;
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    let record = a.record_at([x, y, z]).unwrap();
                    assert_eq!(record.get::<i32>().unwrap(), expected);
                    expected += 1;
                }
            }
        }

        // Column-major: the first coordinate varies fastest.
        let mut expected = 0;
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    let record = c.record_at([x, y, z]).unwrap();
                    assert_eq!(record.get::<i32>().unwrap(), expected);
                    expected += 1;
                }
            }
        }

        assert!(a.record_at([1, 2]).is_err());
        assert!(a.record_at([9, 9, 9]).is_err());
    }

    #[test]
    fn test_record_distance() {
        let a = Array::from_scalars(&[0u8; 10], [10]).unwrap();
        let b = a.clone();

        let first = a.record(0).unwrap();
        let last = a.record(9).unwrap();

        assert_eq!(last.distance(&first).unwrap(), 9);
        assert_eq!(first.distance(&last).unwrap(), -9);
        assert_eq!(first.distance(&first).unwrap(), 0);

        let other = b.record(0).unwrap();
        assert!(first.distance(&other).is_err());
    }

    #[test]
    fn test_convert_to_round_trip() {
        let values: Vec<i32> = (0..27).collect();
        let a = Array::from_scalars(&values, [3, 3, 3]).unwrap();
        let mut b = a.clone();

        b.convert_to(Endian::OPPOSITE);
        assert_ne!(b.data(), a.data());
        assert_eq!(b.dtype().unwrap().endian(), Endian::OPPOSITE);

        b.convert_to(Endian::NATIVE);
        assert_eq!(b.data(), a.data());
        assert_eq!(b.dtype().unwrap().endian(), Endian::NATIVE);

        for (x, y) in a.records().zip(b.records()) {
            assert_eq!(x.get::<i32>().unwrap(), y.get::<i32>().unwrap());
        }
    }

    #[test]
    fn test_convert_to_is_idempotent() {
        let values: Vec<u16> = (0..6).collect();
        let mut a = Array::from_scalars(&values, [2, 3]).unwrap();

        a.convert_to(Endian::OPPOSITE);
        let converted = a.data().to_vec();

        a.convert_to(Endian::OPPOSITE);
        assert_eq!(a.data(), &converted[..]);
    }

    #[test]
    fn test_convert_to_swaps_every_record() {
        let values: Vec<u32> = vec![0x0102_0304; 4];
        let mut a = Array::from_scalars(&values, [4]).unwrap();

        a.convert_to(Endian::OPPOSITE);

        for record in a.records() {
            assert_eq!(record.get::<u32>().unwrap(), 0x0403_0201);
        }
    }

    #[test]
    fn test_header() {
        let a = Array::new(record_descr(), [2, 5], Order::ColumnMajor);
        let header = a.header();

        assert!(header.starts_with("{'descr': [('id',"));
        assert!(header.contains("'fortran_order': True"));
        assert!(header.ends_with("'shape': (2,5,)}"));
    }
}
