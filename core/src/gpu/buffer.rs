use bitflags::bitflags;

use super::*;

bitflags! {
  #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
  pub struct BufferUsage: u32 {
    const VERTEX       = 0b1;
    const INDEX        = 0b10;
    const UNIFORM      = 0b100;
    const STORAGE      = 0b1000;
    const TRANSFER_SRC = 0b10000;
    const TRANSFER_DST = 0b100000;
  }
}

pub trait Buffer {
  fn size(&self) -> u64;
  fn usage(&self) -> BufferUsage;

  /// Maps the whole buffer. The pointer stays valid until `unmap`.
  unsafe fn map(&self) -> GraphicsResult<*mut u8>;
  unsafe fn unmap(&self);

  fn upload(&self, data: &[u8], offset: u64) -> GraphicsResult<()> {
    check_range(self.size(), data.len() as u64, offset)?;
    unsafe {
      let ptr = self.map()?;
      std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
      self.unmap();
    }
    Ok(())
  }

  fn download(&self, size: u64, offset: u64) -> GraphicsResult<Vec<u8>> {
    check_range(self.size(), size, offset)?;
    let mut data = vec![0u8; size as usize];
    unsafe {
      let ptr = self.map()?;
      std::ptr::copy_nonoverlapping(ptr.add(offset as usize), data.as_mut_ptr(), data.len());
      self.unmap();
    }
    Ok(data)
  }
}

pub fn check_range(buffer_size: u64, size: u64, offset: u64) -> GraphicsResult<()> {
  match offset.checked_add(size) {
    Some(end) if end <= buffer_size => Ok(()),
    _ => Err(GraphicsError::InvalidUsage(format!(
      "Range {}..{} exceeds buffer of size {}", offset, offset.saturating_add(size), buffer_size)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  struct HostBuffer {
    data: RefCell<Vec<u8>>
  }

  impl Buffer for HostBuffer {
    fn size(&self) -> u64 {
      self.data.borrow().len() as u64
    }

    fn usage(&self) -> BufferUsage {
      BufferUsage::UNIFORM
    }

    unsafe fn map(&self) -> GraphicsResult<*mut u8> {
      Ok(self.data.borrow_mut().as_mut_ptr())
    }

    unsafe fn unmap(&self) {}
  }

  #[test]
  fn upload_then_download_at_offset() {
    let buffer = HostBuffer { data: RefCell::new(vec![0; 8]) };
    buffer.upload(&[1, 2, 3], 4).unwrap();
    assert_eq!(buffer.download(4, 4).unwrap(), vec![1, 2, 3, 0]);
    assert_eq!(buffer.download(2, 0).unwrap(), vec![0, 0]);
  }

  #[test]
  fn out_of_range_access_fails() {
    let buffer = HostBuffer { data: RefCell::new(vec![0; 8]) };
    assert!(buffer.upload(&[0; 4], 6).is_err());
    assert!(buffer.download(1, u64::MAX).is_err());
    assert!(check_range(8, 8, 0).is_ok());
  }
}
