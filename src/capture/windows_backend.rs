use super::{CaptureError, TouchFrame, TouchPoint, TouchSource};
use std::sync::mpsc;
use windows::core::PCWSTR;
use windows::Win32::Devices::HumanInterfaceDevice::*;
use windows::Win32::Foundation::*;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::*;
use windows::Win32::UI::WindowsAndMessaging::*;

const HID_USAGE_PAGE_DIGITIZER: u16 = 0x0D;
const HID_USAGE_DIGITIZER_TOUCH_SCREEN: u16 = 0x04;
const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const USAGE_X: u16 = 0x30;
const USAGE_Y: u16 = 0x31;
const USAGE_TIP_SWITCH: u16 = 0x42;
const USAGE_CONTACT_ID: u16 = 0x51;
const USAGE_CONTACT_COUNT: u16 = 0x54;
const USAGE_CONTACT_COUNT_MAX: u16 = 0x55;

/// Raw Input touchscreen source.
///
/// Windows delivers complete HID reports via WM_INPUT on a message-only
/// window owned by a dedicated thread. Each report carries every active
/// contact, which maps directly onto a [`TouchFrame`].
pub struct RawTouchSource {
    frame_rx: mpsc::Receiver<TouchFrame>,
    _thread: Option<std::thread::JoinHandle<()>>,
}

impl RawTouchSource {
    pub fn open() -> Result<Self, CaptureError> {
        let (tx, rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("raw-touch".into())
            .spawn(move || {
                if let Err(e) = run_rawinput_loop(tx) {
                    tracing::error!(error = %e, "raw input thread failed");
                }
            })
            .map_err(|e| CaptureError::OpenFailed(e.to_string()))?;

        Ok(Self {
            frame_rx: rx,
            _thread: Some(thread),
        })
    }
}

impl TouchSource for RawTouchSource {
    fn name(&self) -> &str {
        "raw-input"
    }

    fn poll_frame(&mut self) -> Result<Option<TouchFrame>, CaptureError> {
        match self.frame_rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(CaptureError::ReadError("raw input thread died".to_string()))
            }
        }
    }
}

fn run_rawinput_loop(tx: mpsc::Sender<TouchFrame>) -> Result<(), Box<dyn std::error::Error>> {
    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null())?;

        let class_name: Vec<u16> = "TapdeckRawTouch\0".encode_utf16().collect();
        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(raw_input_wnd_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        RegisterClassExW(&wc);

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            PCWSTR(class_name.as_ptr()),
            PCWSTR::null(),
            WS_OVERLAPPEDWINDOW,
            0,
            0,
            0,
            0,
            Some(HWND_MESSAGE),
            None,
            Some(hinstance.into()),
            None,
        )?;

        let rid = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_DIGITIZER,
            usUsage: HID_USAGE_DIGITIZER_TOUCH_SCREEN,
            dwFlags: RIDEV_INPUTSINK,
            hwndTarget: hwnd,
        };

        RegisterRawInputDevices(&[rid], std::mem::size_of::<RAWINPUTDEVICE>() as u32)
            .map_err(|e| format!("RegisterRawInputDevices: {}", e))?;
        tracing::info!("registered for raw touchscreen input");

        TX.set(Some(tx));

        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    Ok(())
}

thread_local! {
    static TX: std::cell::Cell<Option<mpsc::Sender<TouchFrame>>> = const { std::cell::Cell::new(None) };
    static PREPARSED_CACHE: std::cell::RefCell<Option<PreparsedCache>> = const { std::cell::RefCell::new(None) };
}

struct PreparsedCache {
    device: HANDLE,
    data: Vec<u8>,
    button_caps: Vec<HIDP_BUTTON_CAPS>,
    max_contacts: u32,
    x_max: f32,
    y_max: f32,
}

unsafe extern "system" fn raw_input_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_INPUT {
        let hrawinput = HRAWINPUT(lparam.0 as *mut std::ffi::c_void);
        handle_raw_input(hrawinput);
        return LRESULT(0);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

unsafe fn handle_raw_input(hrawinput: HRAWINPUT) {
    let mut size = 0u32;
    let header_size = std::mem::size_of::<RAWINPUTHEADER>() as u32;
    if GetRawInputData(hrawinput, RID_INPUT, None, &mut size, header_size) != 0 {
        return;
    }

    let mut buffer = vec![0u8; size as usize];
    let read = GetRawInputData(
        hrawinput,
        RID_INPUT,
        Some(buffer.as_mut_ptr() as *mut std::ffi::c_void),
        &mut size,
        header_size,
    );
    if read == u32::MAX {
        return;
    }

    let raw = &*(buffer.as_ptr() as *const RAWINPUT);
    if raw.header.dwType != RIM_TYPEHID.0 {
        return;
    }

    let hid = &raw.data.hid;
    let report_size = hid.dwSizeHid as usize;
    let report_count = hid.dwCount as usize;
    if report_size == 0 || report_count == 0 {
        return;
    }

    ensure_preparsed_cache(raw.header.hDevice);

    PREPARSED_CACHE.with(|cache| {
        let cache = cache.borrow();
        let Some(cache) = cache.as_ref() else {
            return;
        };

        let raw_data_ptr = &hid.bRawData as *const u8;
        for report_idx in 0..report_count {
            let report =
                std::slice::from_raw_parts(raw_data_ptr.add(report_idx * report_size), report_size);
            if let Some(frame) = parse_touch_report(cache, report) {
                TX.with(|cell| {
                    let tx = cell.take();
                    if let Some(ref sender) = tx {
                        let _ = sender.send(frame);
                    }
                    cell.set(tx);
                });
            }
        }
    });
}

unsafe fn ensure_preparsed_cache(device_handle: HANDLE) {
    PREPARSED_CACHE.with(|cache| {
        if cache
            .borrow()
            .as_ref()
            .is_some_and(|c| c.device == device_handle)
        {
            return;
        }

        let mut data_size = 0u32;
        if GetRawInputDeviceInfoW(Some(device_handle), RIDI_PREPARSEDDATA, None, &mut data_size)
            != 0
        {
            return;
        }

        let mut preparsed_buf = vec![0u8; data_size as usize];
        let read = GetRawInputDeviceInfoW(
            Some(device_handle),
            RIDI_PREPARSEDDATA,
            Some(preparsed_buf.as_mut_ptr() as *mut std::ffi::c_void),
            &mut data_size,
        );
        if read == u32::MAX {
            return;
        }

        let preparsed = PHIDP_PREPARSED_DATA(preparsed_buf.as_ptr() as isize);

        let mut caps = HIDP_CAPS::default();
        if HidP_GetCaps(preparsed, &mut caps) != HIDP_STATUS_SUCCESS {
            return;
        }

        let mut num_value_caps = caps.NumberInputValueCaps;
        let mut value_caps = vec![HIDP_VALUE_CAPS::default(); num_value_caps as usize];
        if num_value_caps > 0 {
            let _ = HidP_GetValueCaps(
                HidP_Input,
                value_caps.as_mut_ptr(),
                &mut num_value_caps,
                preparsed,
            );
            value_caps.truncate(num_value_caps as usize);
        }

        let mut num_button_caps = caps.NumberInputButtonCaps;
        let mut button_caps = vec![HIDP_BUTTON_CAPS::default(); num_button_caps as usize];
        if num_button_caps > 0 {
            let _ = HidP_GetButtonCaps(
                HidP_Input,
                button_caps.as_mut_ptr(),
                &mut num_button_caps,
                preparsed,
            );
            button_caps.truncate(num_button_caps as usize);
        }

        let logical_max = |page: u16, usage: u16| {
            value_caps
                .iter()
                .find(|vc| vc.UsagePage == page && vc.Anonymous.NotRange.Usage == usage)
                .map(|vc| vc.LogicalMax.max(1) as f32)
        };

        let max_contacts = logical_max(HID_USAGE_PAGE_DIGITIZER, USAGE_CONTACT_COUNT_MAX)
            .map(|v| v as u32)
            .unwrap_or(10);
        let x_max = logical_max(HID_USAGE_PAGE_GENERIC, USAGE_X).unwrap_or(32767.0);
        let y_max = logical_max(HID_USAGE_PAGE_GENERIC, USAGE_Y).unwrap_or(32767.0);
        tracing::debug!(max_contacts, x_max, y_max, "touchscreen caps");

        *cache.borrow_mut() = Some(PreparsedCache {
            device: device_handle,
            data: preparsed_buf,
            button_caps,
            max_contacts,
            x_max,
            y_max,
        });
    });
}

unsafe fn parse_touch_report(cache: &PreparsedCache, report: &[u8]) -> Option<TouchFrame> {
    let preparsed = PHIDP_PREPARSED_DATA(cache.data.as_ptr() as isize);

    let contact_count =
        get_usage_value(preparsed, HID_USAGE_PAGE_DIGITIZER, 0, USAGE_CONTACT_COUNT, report)
            .unwrap_or(0);
    // Hybrid-mode continuation reports carry a zero count; skip them.
    if contact_count == 0 {
        return None;
    }

    let mut contacts = Vec::with_capacity(contact_count as usize);
    for link_collection in 1..=cache.max_contacts as u16 {
        if contacts.len() >= contact_count as usize {
            break;
        }
        let tip = get_button_state(
            cache,
            preparsed,
            HID_USAGE_PAGE_DIGITIZER,
            link_collection,
            USAGE_TIP_SWITCH,
            report,
        );
        if !tip {
            continue;
        }
        let Some(id) = get_usage_value(
            preparsed,
            HID_USAGE_PAGE_DIGITIZER,
            link_collection,
            USAGE_CONTACT_ID,
            report,
        ) else {
            continue;
        };
        let x = get_usage_value(preparsed, HID_USAGE_PAGE_GENERIC, link_collection, USAGE_X, report)
            .unwrap_or(0);
        let y = get_usage_value(preparsed, HID_USAGE_PAGE_GENERIC, link_collection, USAGE_Y, report)
            .unwrap_or(0);

        contacts.push(TouchPoint {
            id: id as i64,
            x: (x as f32 / cache.x_max).clamp(0.0, 1.0),
            y: (y as f32 / cache.y_max).clamp(0.0, 1.0),
        });
    }

    Some(TouchFrame { contacts })
}

unsafe fn get_usage_value(
    preparsed: PHIDP_PREPARSED_DATA,
    usage_page: u16,
    link_collection: u16,
    usage: u16,
    report: &[u8],
) -> Option<u32> {
    let mut value = 0u32;
    let status = HidP_GetUsageValue(
        HidP_Input,
        usage_page,
        Some(link_collection),
        usage,
        &mut value,
        preparsed,
        report,
    );
    if status == HIDP_STATUS_SUCCESS {
        Some(value)
    } else {
        None
    }
}

unsafe fn get_button_state(
    cache: &PreparsedCache,
    preparsed: PHIDP_PREPARSED_DATA,
    usage_page: u16,
    link_collection: u16,
    usage: u16,
    report: &[u8],
) -> bool {
    let relevant = cache
        .button_caps
        .iter()
        .any(|bc| bc.UsagePage == usage_page && bc.LinkCollection == link_collection);

    if !relevant {
        return get_usage_value(preparsed, usage_page, link_collection, usage, report)
            .map(|v| v != 0)
            .unwrap_or(false);
    }

    let mut usage_list = [USAGE_AND_PAGE::default(); 64];
    let mut usage_count = usage_list.len() as u32;

    let status = HidP_GetUsagesEx(
        HidP_Input,
        Some(link_collection),
        usage_list.as_mut_ptr(),
        &mut usage_count,
        preparsed,
        report,
    );
    if status != HIDP_STATUS_SUCCESS {
        return false;
    }

    usage_list[..usage_count as usize]
        .iter()
        .any(|u| u.UsagePage == usage_page && u.Usage == usage)
}
