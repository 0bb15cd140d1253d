#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerPort {
    One,
    Two,
}

/// Standard controller buttons, in shift-register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKey {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl ControllerKey {
    pub const fn mask(self) -> u8 {
        match self {
            ControllerKey::A => 0x01,
            ControllerKey::B => 0x02,
            ControllerKey::Select => 0x04,
            ControllerKey::Start => 0x08,
            ControllerKey::Up => 0x10,
            ControllerKey::Down => 0x20,
            ControllerKey::Left => 0x40,
            ControllerKey::Right => 0x80,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerState {
    buttons: u8,
    shift_register: u8,
    reads: u8,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: ControllerKey, pressed: bool) {
        if pressed {
            self.buttons |= key.mask();
        } else {
            self.buttons &= !key.mask();
        }
    }

    pub fn is_pressed(&self, key: ControllerKey) -> bool {
        self.buttons & key.mask() != 0
    }

    /// Latch current button states into shift register
    pub fn latch(&mut self) {
        self.shift_register = self.buttons;
        self.reads = 0;
    }

    /// While strobe is high the A button is reported continuously. After
    /// eight reads an official controller keeps returning 1.
    pub fn read(&mut self, strobe: bool) -> u8 {
        if strobe {
            return self.buttons & 0x01;
        }
        if self.reads >= 8 {
            return 1;
        }
        let bit = (self.shift_register >> self.reads) & 0x01;
        self.reads += 1;
        bit
    }
}

/// Both controller ports behind $4016/$4017.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub controllers: [ControllerState; 2],
    pub strobe: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn controller(&self, port: ControllerPort) -> &ControllerState {
        &self.controllers[port as usize]
    }

    pub fn set_key(&mut self, port: ControllerPort, key: ControllerKey, pressed: bool) {
        self.controllers[port as usize].set(key, pressed);
    }

    /// $4016 write. Bit 0 is the strobe shared by both ports.
    pub fn cpu_write(&mut self, _addr: u16, value: u8) {
        self.strobe = value & 0x01 != 0;
        // The shift registers follow the buttons for as long as strobe is
        // held, so reloading on every write covers both edges.
        if self.strobe {
            for controller in &mut self.controllers {
                controller.latch();
            }
        }
    }

    /// $4016/$4017 read: one serial bit in bit 0.
    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        let port = (addr & 0x01) as usize;
        let strobe = self.strobe;
        if strobe {
            self.controllers[port].latch();
        }
        self.controllers[port].read(strobe)
    }
}
